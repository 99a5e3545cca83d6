//! Storage boundary shared by the in-memory and SQLite backends.

use hotspot_core::events::{EventKind, TrackingEvent};
use hotspot_core::types::SessionSummary;
use hotspot_core::Result;

/// Selects a subset of the event log. Empty `kinds` means every kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub kinds: Vec<EventKind>,
    pub path: Option<String>,
    pub session_id: Option<String>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: Option<&str>) -> Self {
        self.path = path.map(str::to_string);
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn matches(&self, event: &TrackingEvent) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&event.kind()))
            && self.path.as_deref().map_or(true, |p| event.path == p)
            && self
                .session_id
                .as_deref()
                .map_or(true, |s| event.session_id == s)
    }
}

/// A capped, append-only event log plus the session table.
///
/// `ingest` must be atomic with respect to readers: the session row and the
/// events of one batch become visible together.
pub trait StorageBackend: Send + Sync {
    /// Store the updated session row and append `events` in order.
    ///
    /// Appending to a full log first evicts the oldest half. Returns how many
    /// events were evicted.
    fn ingest(&mut self, session: &SessionSummary, events: &[TrackingEvent]) -> Result<usize>;

    /// Visit matching events in insertion order.
    fn scan(&self, filter: &EventFilter, visit: &mut dyn FnMut(&TrackingEvent)) -> Result<()>;

    fn session(&self, session_id: &str) -> Result<Option<SessionSummary>>;

    fn sessions(&self) -> Result<Vec<SessionSummary>>;

    fn event_count(&self) -> Result<u64>;

    /// Human-readable backend name for logs and health output.
    fn name(&self) -> &'static str;
}

/// How many events to drop when a log of capacity `max_events` is full.
pub(crate) fn eviction_size(max_events: usize) -> usize {
    (max_events / 2).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotspot_core::events::{CustomData, EventData};
    use hotspot_core::types::ViewportSnapshot;

    fn event(kind_data: EventData, path: &str, session: &str) -> TrackingEvent {
        TrackingEvent {
            timestamp: 1,
            session_id: session.to_string(),
            user_id: "u".to_string(),
            url: String::new(),
            path: path.to_string(),
            viewport: ViewportSnapshot::default(),
            data: kind_data,
        }
    }

    #[test]
    fn test_filter_matching() {
        let custom = event(EventData::Custom(CustomData::default()), "/a", "s1");

        assert!(EventFilter::all().matches(&custom));
        assert!(EventFilter::kinds([EventKind::Custom]).matches(&custom));
        assert!(!EventFilter::kinds([EventKind::Click]).matches(&custom));
        assert!(EventFilter::all().with_path(Some("/a")).matches(&custom));
        assert!(!EventFilter::all().with_path(Some("/b")).matches(&custom));
        assert!(EventFilter::all().with_path(None).matches(&custom));
        assert!(!EventFilter::all().with_session("s2").matches(&custom));
    }

    #[test]
    fn test_eviction_size() {
        assert_eq!(eviction_size(100_000), 50_000);
        assert_eq!(eviction_size(1), 1);
    }
}
