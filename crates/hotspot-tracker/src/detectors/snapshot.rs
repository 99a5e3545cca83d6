//! Periodic DOM snapshots.

use hotspot_core::events::{DomSnapshotData, EventData};
use tracing::debug;

use crate::element::truncate_chars;
use crate::host::Host;
use crate::recorder::Record;

const MAX_SNAPSHOT_CHARS: usize = 50_000;

/// Captures truncated document markup. Serialization failures skip the tick.
#[derive(Debug)]
pub struct SnapshotDetector {
    enabled: bool,
}

impl SnapshotDetector {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true when a snapshot was recorded.
    pub fn capture(&self, host: &dyn Host, rec: &mut dyn Record) -> bool {
        if !self.enabled {
            return false;
        }

        let markup = match host.serialize_document() {
            Ok(markup) => markup,
            Err(e) => {
                debug!(error = %e, "Skipping DOM snapshot");
                return false;
            }
        };

        rec.record(EventData::DomSnapshot(DomSnapshotData {
            snapshot: truncate_chars(&markup, MAX_SNAPSHOT_CHARS),
            url: host.location().href,
            title: host.document_title(),
        }));
        true
    }
}
