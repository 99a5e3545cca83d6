//! The aggregation store: one writer at a time, concurrent readers.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use hotspot_core::config::{BackendKind, StoreConfig};
use hotspot_core::events::{Batch, EventKind, TrackingEvent};
use hotspot_core::types::{
    ElementInteraction, HeatmapPoint, Overview, PageStats, ScrollDepthBucket, SessionSummary,
};
use hotspot_core::{HotspotError, Result};

use crate::aggregate::{ElementRanking, HeatmapGrid, PageRollup, ScrollHistogram};
use crate::backend::{EventFilter, StorageBackend};
use crate::memory::MemoryBackend;
use crate::session::{apply_batch, new_session};
use crate::sqlite::SqliteBackend;

/// Outcome of one `add_events` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub accepted: usize,
    pub evicted: usize,
}

/// Event log, session table and the read queries over them.
///
/// `add_events` holds the write lock for the whole batch, so readers never
/// see a session row without its events. Reads share the lock and see the
/// state as of the call.
pub struct AnalyticsStore {
    backend: RwLock<Box<dyn StorageBackend>>,
}

impl AnalyticsStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend: RwLock::new(backend),
        }
    }

    pub fn in_memory(max_events: usize) -> Self {
        Self::new(Box::new(MemoryBackend::new(max_events)))
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let backend: Box<dyn StorageBackend> = match config.backend {
            BackendKind::Memory => Box::new(MemoryBackend::new(config.max_events)),
            BackendKind::Sqlite => Box::new(SqliteBackend::open(
                Path::new(&config.sqlite_path),
                config.max_events,
            )?),
        };
        info!(
            backend = backend.name(),
            max_events = config.max_events,
            "Analytics store ready"
        );
        Ok(Self::new(backend))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Box<dyn StorageBackend>>> {
        self.backend
            .read()
            .map_err(|e| HotspotError::Storage(format!("Store lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Box<dyn StorageBackend>>> {
        self.backend
            .write()
            .map_err(|e| HotspotError::Storage(format!("Store lock poisoned: {}", e)))
    }

    pub fn backend_name(&self) -> Result<&'static str> {
        Ok(self.read()?.name())
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Upsert the batch's session row and append its events.
    pub fn add_events(&self, batch: &Batch) -> Result<IngestOutcome> {
        let mut backend = self.write()?;

        let mut session = match backend.session(&batch.session_id)? {
            Some(existing) => existing,
            None => new_session(batch),
        };
        apply_batch(&mut session, batch);

        let evicted = backend.ingest(&session, &batch.events)?;
        if evicted > 0 {
            info!(evicted, backend = backend.name(), "Event log full; evicted oldest events");
        }
        debug!(
            session_id = %batch.session_id,
            events = batch.events.len(),
            "Batch stored"
        );

        Ok(IngestOutcome {
            accepted: batch.events.len(),
            evicted,
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    fn scan(&self, filter: &EventFilter, mut visit: impl FnMut(&TrackingEvent)) -> Result<()> {
        self.read()?.scan(filter, &mut visit)
    }

    pub fn click_heatmap(&self, path: Option<&str>) -> Result<Vec<HeatmapPoint>> {
        let mut grid = HeatmapGrid::clicks();
        self.scan(
            &EventFilter::kinds([EventKind::Click]).with_path(path),
            |e| grid.add_click(e),
        )?;
        Ok(grid.finish())
    }

    pub fn mouse_heatmap(&self, path: Option<&str>) -> Result<Vec<HeatmapPoint>> {
        let mut grid = HeatmapGrid::mouse();
        self.scan(
            &EventFilter::kinds([EventKind::MouseTrail]).with_path(path),
            |e| grid.add_trail(e),
        )?;
        Ok(grid.finish())
    }

    pub fn scroll_depth_histogram(&self, path: Option<&str>) -> Result<Vec<ScrollDepthBucket>> {
        let mut histogram = ScrollHistogram::default();
        self.scan(
            &EventFilter::kinds([EventKind::Scroll]).with_path(path),
            |e| histogram.add(e),
        )?;
        Ok(histogram.finish())
    }

    pub fn rage_clicks(&self, path: Option<&str>) -> Result<Vec<TrackingEvent>> {
        self.collect(&EventFilter::kinds([EventKind::RageClick]).with_path(path))
    }

    /// Most recently started first.
    pub fn session_list(&self) -> Result<Vec<SessionSummary>> {
        let mut sessions = self.read()?.sessions()?;
        sessions.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(sessions)
    }

    pub fn session(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        self.read()?.session(session_id)
    }

    /// Every stored event of one session, by timestamp (stable for ties).
    pub fn session_events(&self, session_id: &str) -> Result<Vec<TrackingEvent>> {
        let mut events = self.collect(&EventFilter::all().with_session(session_id))?;
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    pub fn page_stats(&self) -> Result<Vec<PageStats>> {
        let mut rollup = PageRollup::default();
        self.scan(&EventFilter::all(), |e| rollup.add(e))?;
        Ok(rollup.finish())
    }

    /// All `performance` and `web_vital` events.
    pub fn performance_data(&self) -> Result<Vec<TrackingEvent>> {
        self.collect(&EventFilter::kinds([
            EventKind::Performance,
            EventKind::WebVital,
        ]))
    }

    pub fn element_interactions(&self, path: Option<&str>) -> Result<Vec<ElementInteraction>> {
        let mut ranking = ElementRanking::default();
        self.scan(
            &EventFilter::kinds([EventKind::Click]).with_path(path),
            |e| ranking.add(e),
        )?;
        Ok(ranking.finish())
    }

    pub fn event_count(&self) -> Result<u64> {
        self.read()?.event_count()
    }

    pub fn session_count(&self) -> Result<u64> {
        Ok(self.read()?.sessions()?.len() as u64)
    }

    /// Distinct user ids across the whole event log.
    pub fn unique_user_count(&self) -> Result<u64> {
        let mut users = HashSet::new();
        self.scan(&EventFilter::all(), |e| {
            if !users.contains(&e.user_id) {
                users.insert(e.user_id.clone());
            }
        })?;
        Ok(users.len() as u64)
    }

    /// Headline numbers, all read under one lock acquisition.
    pub fn overview(&self) -> Result<Overview> {
        let backend = self.read()?;
        let mut users = HashSet::new();
        let mut rollup = PageRollup::default();
        backend.scan(&EventFilter::all(), &mut |e: &TrackingEvent| {
            if !users.contains(&e.user_id) {
                users.insert(e.user_id.clone());
            }
            rollup.add(e);
        })?;

        Ok(Overview {
            total_events: backend.event_count()?,
            total_sessions: backend.sessions()?.len() as u64,
            unique_users: users.len() as u64,
            pages: rollup.finish(),
        })
    }

    fn collect(&self, filter: &EventFilter) -> Result<Vec<TrackingEvent>> {
        let mut out = Vec::new();
        self.scan(filter, |e| out.push(e.clone()))?;
        Ok(out)
    }
}

impl std::fmt::Debug for AnalyticsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsStore").finish_non_exhaustive()
    }
}
