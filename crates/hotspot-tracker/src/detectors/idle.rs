//! Idle detection.

use hotspot_core::config::TrackerConfig;
use hotspot_core::events::{EventData, IdleEndData, IdleStartData};
use hotspot_core::types::EpochMillis;

use crate::recorder::Record;

/// Tracks the last activity time and emits idle transitions.
///
/// `check` is driven by a periodic timer. Activity while idle emits
/// `idle_end` immediately, so the duration covers the whole idle stretch.
#[derive(Debug)]
pub struct IdleDetector {
    timeout_ms: i64,
    last_activity: EpochMillis,
    idle_since: Option<EpochMillis>,
}

impl IdleDetector {
    pub fn new(config: &TrackerConfig, now: EpochMillis) -> Self {
        Self {
            timeout_ms: i64::try_from(config.idle_timeout_ms).unwrap_or(i64::MAX),
            last_activity: now,
            idle_since: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle_since.is_some()
    }

    /// Note user activity, ending an idle stretch if one is open.
    ///
    /// `idle_end` is recorded here, on the activity itself; `check` only
    /// opens idle stretches.
    pub fn touch(&mut self, now: EpochMillis, rec: &mut dyn Record) {
        if let Some(since) = self.idle_since.take() {
            rec.record(EventData::IdleEnd(IdleEndData {
                idle_duration: now - since,
            }));
        }
        self.last_activity = now;
    }

    pub fn check(&mut self, now: EpochMillis, rec: &mut dyn Record) {
        if self.idle_since.is_none() && now - self.last_activity > self.timeout_ms {
            self.idle_since = Some(self.last_activity);
            rec.record(EventData::IdleStart(IdleStartData {
                idle_after: u64::try_from(self.timeout_ms).unwrap_or_default(),
            }));
        }
    }
}
