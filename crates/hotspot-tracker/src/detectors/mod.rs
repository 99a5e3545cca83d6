//! Interaction detectors.
//!
//! Each detector owns the state for one kind of signal and turns raw host
//! notifications into events on a [`Record`](crate::recorder::Record) sink.
//! Detectors never fail; a notification they cannot use is ignored.

pub mod click;
pub mod element_visibility;
pub mod errors;
pub mod form;
pub mod idle;
pub mod page_visibility;
pub mod performance;
pub mod pointer;
pub mod scroll;
pub mod snapshot;

pub use click::ClickDetector;
pub use element_visibility::{ElementVisibilityDetector, IntersectionEntry};
pub use errors::{ErrorDetector, ErrorReport};
pub use form::{FormDetector, FormField};
pub use idle::IdleDetector;
pub use page_visibility::PageVisibilityDetector;
pub use performance::{LayoutShiftEntry, NavigationTiming, PerformanceDetector};
pub use pointer::PointerDetector;
pub use scroll::ScrollDetector;
pub use snapshot::SnapshotDetector;

use hotspot_core::types::EpochMillis;

/// Pointer position for clicks and moves.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerInput {
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub button: i16,
}

impl PointerInput {
    /// A pointer on an unscrolled page.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            client_x: x,
            client_y: y,
            page_x: x,
            page_y: y,
            button: 0,
        }
    }
}

/// Admits at most one notification per interval.
#[derive(Debug)]
pub struct Throttle {
    interval_ms: i64,
    last: Option<EpochMillis>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: i64::try_from(interval_ms).unwrap_or(i64::MAX),
            last: None,
        }
    }

    pub fn admit(&mut self, now: EpochMillis) -> bool {
        match self.last {
            Some(last) if now - last < self.interval_ms => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_window() {
        let mut throttle = Throttle::new(100);
        assert!(throttle.admit(0));
        assert!(!throttle.admit(50));
        assert!(!throttle.admit(99));
        assert!(throttle.admit(100));
        assert!(!throttle.admit(150));
    }

    #[test]
    fn test_zero_interval_admits_everything() {
        let mut throttle = Throttle::new(0);
        assert!(throttle.admit(5));
        assert!(throttle.admit(5));
    }
}
