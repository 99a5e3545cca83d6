//! Clicks and rage-click bursts.

use hotspot_core::config::TrackerConfig;
use hotspot_core::events::{ClickData, EventData, RageClickData};
use hotspot_core::types::{ElementMeta, EpochMillis};

use super::PointerInput;
use crate::recorder::Record;

#[derive(Clone, Copy, Debug)]
struct ClickSample {
    x: f64,
    y: f64,
    t: EpochMillis,
}

/// Emits `click` for every click and `rage_click` for tight bursts.
///
/// A burst is `threshold` clicks inside the sliding window whose every point
/// lies strictly within `tolerance` pixels of the burst centroid on both axes.
/// History is cleared each time the threshold is reached, clustered or not.
#[derive(Debug)]
pub struct ClickDetector {
    threshold: usize,
    window_ms: i64,
    tolerance: f64,
    history: Vec<ClickSample>,
}

impl ClickDetector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            threshold: config.rage_click_threshold.max(1),
            window_ms: i64::try_from(config.rage_click_window_ms).unwrap_or(i64::MAX),
            tolerance: config.rage_click_tolerance_px,
            history: Vec::new(),
        }
    }

    /// Returns true when this click completed a rage burst.
    pub fn on_click(
        &mut self,
        now: EpochMillis,
        input: &PointerInput,
        element: ElementMeta,
        rec: &mut dyn Record,
    ) -> bool {
        rec.record(EventData::Click(ClickData {
            x: input.client_x,
            y: input.client_y,
            page_x: Some(input.page_x),
            page_y: Some(input.page_y),
            button: input.button,
            element: Some(element.clone()),
            timestamp: now,
        }));

        self.history.push(ClickSample {
            x: input.client_x,
            y: input.client_y,
            t: now,
        });
        self.history.retain(|c| now - c.t < self.window_ms);

        if self.history.len() < self.threshold {
            return false;
        }

        let n = self.history.len() as f64;
        let cx = self.history.iter().map(|c| c.x).sum::<f64>() / n;
        let cy = self.history.iter().map(|c| c.y).sum::<f64>() / n;
        let clustered = self
            .history
            .iter()
            .all(|c| (c.x - cx).abs() < self.tolerance && (c.y - cy).abs() < self.tolerance);

        if clustered {
            rec.record(EventData::RageClick(RageClickData {
                x: cx.round(),
                y: cy.round(),
                click_count: self.history.len() as u32,
                element: Some(element),
            }));
        }
        self.history.clear();
        clustered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::CollectingRecorder;

    fn detector() -> ClickDetector {
        ClickDetector::new(&TrackerConfig::default())
    }

    fn button() -> ElementMeta {
        ElementMeta {
            tag: "button".to_string(),
            selector: "button#buy".to_string(),
            ..Default::default()
        }
    }

    fn rage_events(rec: &CollectingRecorder) -> Vec<&RageClickData> {
        rec.events
            .iter()
            .filter_map(|e| match e {
                EventData::RageClick(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_three_tight_clicks_rage() {
        let mut clicks = detector();
        let mut rec = CollectingRecorder::default();

        assert!(!clicks.on_click(0, &PointerInput::at(100.0, 100.0), button(), &mut rec));
        assert!(!clicks.on_click(200, &PointerInput::at(102.0, 101.0), button(), &mut rec));
        assert!(clicks.on_click(400, &PointerInput::at(101.0, 99.0), button(), &mut rec));

        let rage = rage_events(&rec);
        assert_eq!(rage.len(), 1);
        assert_eq!(rage[0].click_count, 3);
        assert_eq!((rage[0].x, rage[0].y), (101.0, 100.0));
        assert_eq!(rec.events.len(), 4);
    }

    #[test]
    fn test_burst_within_tolerance() {
        let mut clicks = detector();
        let mut rec = CollectingRecorder::default();

        clicks.on_click(1_000, &PointerInput::at(100.0, 100.0), button(), &mut rec);
        clicks.on_click(1_200, &PointerInput::at(110.0, 105.0), button(), &mut rec);
        assert!(clicks.on_click(1_400, &PointerInput::at(95.0, 98.0), button(), &mut rec));

        let rage = rage_events(&rec);
        assert_eq!(rage.len(), 1);
        assert_eq!(rage[0].click_count, 3);
        assert_eq!((rage[0].x, rage[0].y), (102.0, 101.0));
        assert_eq!(rage[0].element.as_ref().map(|e| e.selector.as_str()), Some("button#buy"));
    }

    #[test]
    fn test_history_resets_after_burst() {
        let mut clicks = detector();
        let mut rec = CollectingRecorder::default();
        for t in [0, 100, 200] {
            clicks.on_click(t, &PointerInput::at(50.0, 50.0), button(), &mut rec);
        }
        // Fourth click starts a fresh window.
        assert!(!clicks.on_click(300, &PointerInput::at(50.0, 50.0), button(), &mut rec));
        assert_eq!(rage_events(&rec).len(), 1);
    }

    #[test]
    fn test_back_to_back_bursts_rage_twice() {
        let mut clicks = detector();
        let mut rec = CollectingRecorder::default();
        let fired: Vec<bool> = (0..6)
            .map(|n| clicks.on_click(n * 50, &PointerInput::at(50.0, 50.0), button(), &mut rec))
            .collect();

        assert_eq!(fired, [false, false, true, false, false, true]);
        let rage = rage_events(&rec);
        assert_eq!(rage.len(), 2);
        assert!(rage.iter().all(|r| r.click_count == 3));
        assert_eq!(rec.events.len(), 8);
    }

    #[test]
    fn test_spread_clicks_are_not_rage() {
        let mut clicks = detector();
        let mut rec = CollectingRecorder::default();
        clicks.on_click(0, &PointerInput::at(0.0, 0.0), button(), &mut rec);
        clicks.on_click(100, &PointerInput::at(200.0, 0.0), button(), &mut rec);
        assert!(!clicks.on_click(200, &PointerInput::at(400.0, 0.0), button(), &mut rec));
        assert!(rage_events(&rec).is_empty());
        assert_eq!(rec.events.len(), 3);
    }

    #[test]
    fn test_slow_clicks_fall_out_of_window() {
        let mut clicks = detector();
        let mut rec = CollectingRecorder::default();
        clicks.on_click(0, &PointerInput::at(10.0, 10.0), button(), &mut rec);
        clicks.on_click(600, &PointerInput::at(10.0, 10.0), button(), &mut rec);
        assert!(!clicks.on_click(1_200, &PointerInput::at(10.0, 10.0), button(), &mut rec));
        assert!(rage_events(&rec).is_empty());
    }

    #[test]
    fn test_click_payload() {
        let mut clicks = detector();
        let mut rec = CollectingRecorder::default();
        let input = PointerInput {
            client_x: 120.0,
            client_y: 340.0,
            page_x: 120.0,
            page_y: 1_340.0,
            button: 2,
        };
        clicks.on_click(7, &input, button(), &mut rec);

        match &rec.events[0] {
            EventData::Click(c) => {
                assert_eq!(c.page_y, Some(1_340.0));
                assert_eq!(c.button, 2);
                assert_eq!(c.timestamp, 7);
                assert_eq!(c.element.as_ref().unwrap().selector, "button#buy");
            }
            other => panic!("expected click, got {other:?}"),
        }
    }
}
