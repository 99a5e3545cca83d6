//! In-memory reference backend.

use std::collections::{HashMap, VecDeque};

use hotspot_core::events::TrackingEvent;
use hotspot_core::types::SessionSummary;
use hotspot_core::Result;

use crate::backend::{eviction_size, EventFilter, StorageBackend};

/// Capped event log in a `VecDeque`; sessions in a `HashMap`.
#[derive(Debug)]
pub struct MemoryBackend {
    max_events: usize,
    events: VecDeque<TrackingEvent>,
    sessions: HashMap<String, SessionSummary>,
}

impl MemoryBackend {
    pub fn new(max_events: usize) -> Self {
        let max_events = max_events.max(1);
        Self {
            max_events,
            events: VecDeque::with_capacity(max_events.min(4_096)),
            sessions: HashMap::new(),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn ingest(&mut self, session: &SessionSummary, events: &[TrackingEvent]) -> Result<usize> {
        self.sessions
            .insert(session.session_id.clone(), session.clone());

        let mut evicted = 0;
        for event in events {
            if self.events.len() >= self.max_events {
                let drop = eviction_size(self.max_events).min(self.events.len());
                self.events.drain(..drop);
                evicted += drop;
            }
            self.events.push_back(event.clone());
        }
        Ok(evicted)
    }

    fn scan(&self, filter: &EventFilter, visit: &mut dyn FnMut(&TrackingEvent)) -> Result<()> {
        self.events
            .iter()
            .filter(|e| filter.matches(e))
            .for_each(|e| visit(e));
        Ok(())
    }

    fn session(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        Ok(self.sessions.get(session_id).cloned())
    }

    fn sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.sessions.values().cloned().collect())
    }

    fn event_count(&self) -> Result<u64> {
        Ok(self.events.len() as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
