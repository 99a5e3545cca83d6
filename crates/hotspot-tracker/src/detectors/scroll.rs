//! Scroll depth.

use hotspot_core::config::TrackerConfig;
use hotspot_core::events::{EventData, ScrollData};
use hotspot_core::types::{EpochMillis, ViewportSnapshot};

use super::Throttle;
use crate::recorder::Record;

/// Percentage of the scrollable height reached, clamped to 0..=100.
///
/// A page that cannot scroll reports 0.
pub fn scroll_percent(viewport: &ViewportSnapshot) -> u32 {
    let scrollable = viewport.scrollable_height();
    if scrollable <= 0.0 {
        return 0;
    }
    (viewport.scroll_y / scrollable * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Throttled `scroll` events plus the per-page maximum depth.
#[derive(Debug)]
pub struct ScrollDetector {
    throttle: Throttle,
    max_depth: u32,
}

impl ScrollDetector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            throttle: Throttle::new(config.scroll_sample_ms),
            max_depth: 0,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Start a new page view.
    pub fn reset(&mut self) {
        self.max_depth = 0;
    }

    pub fn on_scroll(
        &mut self,
        now: EpochMillis,
        viewport: &ViewportSnapshot,
        rec: &mut dyn Record,
    ) -> bool {
        if !self.throttle.admit(now) {
            return false;
        }

        let percent = scroll_percent(viewport);
        self.max_depth = self.max_depth.max(percent);
        rec.record(EventData::Scroll(ScrollData {
            scroll_y: viewport.scroll_y,
            scroll_percent: Some(percent),
            max_depth: Some(self.max_depth),
        }));
        true
    }
}
