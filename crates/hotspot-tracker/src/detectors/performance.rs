//! Navigation timing and web vitals.

use hotspot_core::events::{EventData, PerformanceData, VitalName, WebVitalData};

use crate::recorder::Record;

/// Navigation timing marks in milliseconds relative to the time origin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigationTiming {
    pub fetch_start: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub dom_interactive: f64,
    pub dom_content_loaded_event_end: f64,
    pub load_event_end: f64,
    pub transfer_size: u64,
}

impl NavigationTiming {
    fn deltas(&self) -> PerformanceData {
        let span = |from: f64, to: f64| (to - from).round() as i64;
        PerformanceData {
            dns: span(self.domain_lookup_start, self.domain_lookup_end),
            tcp: span(self.connect_start, self.connect_end),
            ttfb: span(self.request_start, self.response_start),
            dom_load: span(self.fetch_start, self.dom_content_loaded_event_end),
            full_load: span(self.fetch_start, self.load_event_end),
            dom_interactive: span(self.fetch_start, self.dom_interactive),
            transfer_size: self.transfer_size,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutShiftEntry {
    pub value: f64,
    pub had_recent_input: bool,
}

/// Emits the load `performance` event and `web_vital` events.
///
/// LCP reports the latest entry of each callback. FID is reported once.
/// CLS is a running sum reported after every callback, rounded to three
/// decimals.
#[derive(Debug, Default)]
pub struct PerformanceDetector {
    load_reported: bool,
    fid_reported: bool,
    cls_total: f64,
}

impl PerformanceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the host exposes no navigation entry.
    pub fn on_load(&mut self, timing: Option<&NavigationTiming>, rec: &mut dyn Record) {
        let Some(timing) = timing else {
            return;
        };
        if self.load_reported {
            return;
        }
        self.load_reported = true;
        rec.record(EventData::Performance(timing.deltas()));
    }

    /// `start_times` are the entries of one observer callback, in order.
    pub fn on_largest_contentful_paint(&mut self, start_times: &[f64], rec: &mut dyn Record) {
        if let Some(latest) = start_times.last() {
            record_vital(VitalName::Lcp, latest.round(), rec);
        }
    }

    pub fn on_first_input(&mut self, start_time: f64, processing_start: f64, rec: &mut dyn Record) {
        if self.fid_reported {
            return;
        }
        self.fid_reported = true;
        record_vital(VitalName::Fid, (processing_start - start_time).round(), rec);
    }

    pub fn on_layout_shift(&mut self, entries: &[LayoutShiftEntry], rec: &mut dyn Record) {
        self.cls_total += entries
            .iter()
            .filter(|e| !e.had_recent_input)
            .map(|e| e.value)
            .sum::<f64>();
        record_vital(VitalName::Cls, (self.cls_total * 1000.0).round() / 1000.0, rec);
    }
}

fn record_vital(name: VitalName, value: f64, rec: &mut dyn Record) {
    rec.record(EventData::WebVital(WebVitalData { name, value }));
}
