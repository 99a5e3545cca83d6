//! Sampled mouse trails.

use hotspot_core::config::TrackerConfig;
use hotspot_core::events::{EventData, MouseTrailData};
use hotspot_core::types::{EpochMillis, TrailPoint};

use super::{PointerInput, Throttle};
use crate::recorder::Record;

/// Samples pointer moves and emits them in chunks as `mouse_trail` events.
#[derive(Debug)]
pub struct PointerDetector {
    enabled: bool,
    throttle: Throttle,
    chunk: usize,
    trail: Vec<TrailPoint>,
}

impl PointerDetector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            enabled: config.session_capture,
            throttle: Throttle::new(config.mouse_sample_ms),
            chunk: config.mouse_trail_points.max(1),
            trail: Vec::new(),
        }
    }

    /// Returns true when the move was sampled.
    pub fn on_move(
        &mut self,
        now: EpochMillis,
        input: &PointerInput,
        rec: &mut dyn Record,
    ) -> bool {
        if !self.enabled || !self.throttle.admit(now) {
            return false;
        }

        self.trail.push(TrailPoint {
            x: input.client_x,
            y: input.client_y,
            page_x: input.page_x,
            page_y: input.page_y,
            t: now,
        });
        if self.trail.len() >= self.chunk {
            self.emit(rec);
        }
        true
    }

    /// Emit whatever partial trail is pending.
    pub fn flush_trail(&mut self, rec: &mut dyn Record) {
        if !self.trail.is_empty() {
            self.emit(rec);
        }
    }

    fn emit(&mut self, rec: &mut dyn Record) {
        let points = std::mem::take(&mut self.trail);
        rec.record(EventData::MouseTrail(MouseTrailData { points }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::CollectingRecorder;

    fn trails(rec: &CollectingRecorder) -> Vec<usize> {
        rec.events
            .iter()
            .filter_map(|e| match e {
                EventData::MouseTrail(t) => Some(t.points.len()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_sampling_interval() {
        let mut pointer = PointerDetector::new(&TrackerConfig::default());
        let mut rec = CollectingRecorder::default();
        assert!(pointer.on_move(0, &PointerInput::at(1.0, 1.0), &mut rec));
        assert!(!pointer.on_move(40, &PointerInput::at(2.0, 2.0), &mut rec));
        assert!(pointer.on_move(100, &PointerInput::at(3.0, 3.0), &mut rec));
        pointer.flush_trail(&mut rec);
        assert_eq!(trails(&rec), vec![2]);
    }

    #[test]
    fn test_emits_full_chunks() {
        let mut pointer = PointerDetector::new(&TrackerConfig::default());
        let mut rec = CollectingRecorder::default();
        for i in 0..120 {
            pointer.on_move(i * 100, &PointerInput::at(i as f64, 0.0), &mut rec);
        }
        assert_eq!(trails(&rec), vec![50, 50]);
        pointer.flush_trail(&mut rec);
        assert_eq!(trails(&rec), vec![50, 50, 20]);
    }

    #[test]
    fn test_disabled_without_session_capture() {
        let config = TrackerConfig {
            session_capture: false,
            ..Default::default()
        };
        let mut pointer = PointerDetector::new(&config);
        let mut rec = CollectingRecorder::default();
        assert!(!pointer.on_move(0, &PointerInput::at(1.0, 1.0), &mut rec));
        pointer.flush_trail(&mut rec);
        assert!(rec.events.is_empty());
    }
}
