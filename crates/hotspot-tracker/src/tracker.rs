//! The tracker: wires host notifications to detectors, buffering and delivery.
//!
//! Single-threaded by construction. The host calls the `on_*` methods from
//! its event loop and calls [`Tracker::tick`] periodically to drive the
//! flush, idle and snapshot timers. No method returns an error; capture and
//! delivery problems are logged and swallowed here.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use hotspot_core::config::TrackerConfig;
use hotspot_core::events::{CustomData, EventData, SessionEndData, SessionStartData};
use hotspot_core::types::EpochMillis;
use serde_json::Value;
use tracing::{debug, info};

use crate::detectors::{
    ClickDetector, ElementVisibilityDetector, ErrorDetector, ErrorReport, FormDetector, FormField,
    IdleDetector, IntersectionEntry, LayoutShiftEntry, NavigationTiming, PageVisibilityDetector,
    PerformanceDetector, PointerDetector, PointerInput, ScrollDetector, SnapshotDetector,
};
use crate::dom::DomNode;
use crate::element::describe;
use crate::host::Host;
use crate::navigation::{HistoryApi, HistoryInterceptor, NavigationCause, NavigationDetector};
use crate::recorder::{EventRecorder, Record};
use crate::transmitter::{Transmitter, Transport};

/// `sess_<base36 epoch ms>_<9 random chars>`.
pub fn generate_session_id(now: EpochMillis) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("sess_{}_{}", to_base36(now.max(0) as u64), &random[..9])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Fires every `period_ms`; a zero period never fires.
#[derive(Debug)]
struct PeriodicTask {
    period_ms: i64,
    next_due: EpochMillis,
}

impl PeriodicTask {
    fn new(period_ms: u64, now: EpochMillis) -> Self {
        let period_ms = i64::try_from(period_ms).unwrap_or(i64::MAX);
        Self {
            period_ms,
            next_due: now.saturating_add(period_ms),
        }
    }

    fn poll(&mut self, now: EpochMillis) -> bool {
        if self.period_ms == 0 || now < self.next_due {
            return false;
        }
        self.next_due = now.saturating_add(self.period_ms);
        true
    }
}

pub struct Tracker {
    config: TrackerConfig,
    host: Rc<dyn Host>,
    recorder: EventRecorder,
    started_at: EpochMillis,
    started: bool,
    clicks: ClickDetector,
    pointer: PointerDetector,
    scroll: ScrollDetector,
    forms: FormDetector,
    visibility: PageVisibilityDetector,
    idle: IdleDetector,
    navigation: NavigationDetector,
    performance: PerformanceDetector,
    elements: ElementVisibilityDetector,
    errors: ErrorDetector,
    snapshots: SnapshotDetector,
    flush_timer: PeriodicTask,
    idle_timer: PeriodicTask,
    snapshot_timer: PeriodicTask,
}

impl Tracker {
    pub fn new(config: TrackerConfig, host: Rc<dyn Host>, transport: Rc<dyn Transport>) -> Self {
        let now = host.now_ms();
        let session_id = generate_session_id(now);
        let transmitter = Transmitter::new(config.endpoint.clone(), transport);
        let recorder = EventRecorder::new(
            Rc::clone(&host),
            session_id,
            config.user_id.clone(),
            config.max_batch_size,
            transmitter,
        );

        Self {
            clicks: ClickDetector::new(&config),
            pointer: PointerDetector::new(&config),
            scroll: ScrollDetector::new(&config),
            forms: FormDetector,
            visibility: PageVisibilityDetector,
            idle: IdleDetector::new(&config, now),
            navigation: NavigationDetector::new(host.as_ref()),
            performance: PerformanceDetector::new(),
            elements: ElementVisibilityDetector,
            errors: ErrorDetector,
            snapshots: SnapshotDetector::new(config.snapshots_enabled()),
            flush_timer: PeriodicTask::new(config.flush_interval_ms, now),
            idle_timer: PeriodicTask::new(config.idle_check_interval_ms, now),
            snapshot_timer: PeriodicTask::new(
                if config.snapshots_enabled() {
                    config.snapshot_interval_ms
                } else {
                    0
                },
                now,
            ),
            started_at: now,
            started: false,
            recorder,
            host,
            config,
        }
    }

    /// Record `session_start` and the initial `page_view`. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let location = self.host.location();
        let device = self.host.device();
        self.recorder.record(EventData::SessionStart(SessionStartData {
            url: location.href,
            referrer: self.host.referrer(),
            user_agent: device.user_agent.clone(),
            screen: device.screen_resolution(),
            viewport: self.host.viewport(),
            timezone: device.timezone,
        }));
        self.navigation
            .track_page_view(self.host.as_ref(), &mut self.recorder);
        self.scroll.reset();

        info!(
            session_id = %self.recorder.session_id(),
            user_id = %self.recorder.user_id(),
            endpoint = %self.config.endpoint,
            "Tracker started"
        );
    }

    /// Route notifications from `history` to `tracker`.
    ///
    /// The subscription holds a weak handle, so dropping the tracker turns
    /// later notifications into no-ops.
    pub fn attach_history<H: HistoryApi>(
        tracker: &Rc<RefCell<Tracker>>,
        history: &mut HistoryInterceptor<H>,
    ) {
        let weak: Weak<RefCell<Tracker>> = Rc::downgrade(tracker);
        history.subscribe(move |cause| {
            if let Some(tracker) = weak.upgrade() {
                match tracker.try_borrow_mut() {
                    Ok(mut tracker) => tracker.on_navigation(cause),
                    Err(_) => debug!(?cause, "Tracker busy; navigation notification dropped"),
                }
            }
        });
    }

    // -------------------------------------------------------------------------
    // Host notifications
    // -------------------------------------------------------------------------

    pub fn on_click<N: DomNode>(&mut self, input: &PointerInput, target: &N) {
        let now = self.host.now_ms();
        self.idle.touch(now, &mut self.recorder);
        let element = describe(target);
        self.clicks.on_click(now, input, element, &mut self.recorder);
    }

    pub fn on_mouse_move(&mut self, input: &PointerInput) {
        let now = self.host.now_ms();
        self.idle.touch(now, &mut self.recorder);
        self.pointer.on_move(now, input, &mut self.recorder);
    }

    pub fn on_scroll(&mut self) {
        let now = self.host.now_ms();
        self.idle.touch(now, &mut self.recorder);
        let viewport = self.host.viewport();
        self.scroll.on_scroll(now, &viewport, &mut self.recorder);
    }

    pub fn on_focus_in<N: DomNode>(&mut self, target: &N) {
        self.idle.touch(self.host.now_ms(), &mut self.recorder);
        if let Some(field) = FormField::from_node(target) {
            self.forms.on_focus(field, &mut self.recorder);
        }
    }

    pub fn on_focus_out<N: DomNode>(&mut self, target: &N) {
        if let Some(field) = FormField::from_node(target) {
            self.forms.on_blur(field, &mut self.recorder);
        }
    }

    pub fn on_visibility_change(&mut self, hidden: bool, state: &str) {
        self.visibility.on_change(hidden, state, &mut self.recorder);
    }

    pub fn on_navigation(&mut self, cause: NavigationCause) {
        let changed = self.navigation.check(
            self.host.as_ref(),
            self.scroll.max_depth(),
            &mut self.recorder,
        );
        if changed {
            debug!(?cause, path = %self.host.location().pathname, "Route changed");
            self.scroll.reset();
        }
    }

    pub fn on_error(&mut self, report: ErrorReport) {
        self.errors.on_error(report, &mut self.recorder);
    }

    /// Page finished loading. `timing` is `None` when the host has no
    /// navigation timing entry.
    pub fn on_load(&mut self, timing: Option<&NavigationTiming>) {
        self.performance.on_load(timing, &mut self.recorder);
    }

    pub fn on_largest_contentful_paint(&mut self, start_times: &[f64]) {
        self.performance
            .on_largest_contentful_paint(start_times, &mut self.recorder);
    }

    pub fn on_first_input(&mut self, start_time: f64, processing_start: f64) {
        self.performance
            .on_first_input(start_time, processing_start, &mut self.recorder);
    }

    pub fn on_layout_shift(&mut self, entries: &[LayoutShiftEntry]) {
        self.performance.on_layout_shift(entries, &mut self.recorder);
    }

    pub fn on_intersections<N: DomNode>(&mut self, entries: &[IntersectionEntry<N>]) {
        self.elements.on_intersections(entries, &mut self.recorder);
    }

    /// Page is going away: emit the pending trail and `session_end`, then
    /// send everything still buffered.
    pub fn on_page_hide(&mut self) {
        self.pointer.flush_trail(&mut self.recorder);
        let now = self.host.now_ms();
        self.recorder.record(EventData::SessionEnd(SessionEndData {
            duration: now - self.started_at,
            page_view_count: self.navigation.page_views(),
            max_scroll_depth: self.scroll.max_depth(),
            final_url: self.host.location().href,
        }));
        self.recorder.drain();
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    /// Run whichever periodic tasks are due.
    pub fn tick(&mut self) {
        let now = self.host.now_ms();
        if self.idle_timer.poll(now) {
            self.check_idle();
        }
        if self.snapshot_timer.poll(now) {
            self.capture_snapshot();
        }
        if self.flush_timer.poll(now) {
            self.flush();
        }
    }

    pub fn check_idle(&mut self) {
        self.idle.check(self.host.now_ms(), &mut self.recorder);
    }

    pub fn capture_snapshot(&mut self) {
        self.snapshots
            .capture(self.host.as_ref(), &mut self.recorder);
    }

    // -------------------------------------------------------------------------
    // Public API
    // -------------------------------------------------------------------------

    pub fn flush(&mut self) {
        self.recorder.flush();
    }

    pub fn session_id(&self) -> &str {
        self.recorder.session_id()
    }

    pub fn user_id(&self) -> &str {
        self.recorder.user_id()
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.recorder.set_user_id(user_id);
    }

    /// Record an application-defined `custom` event.
    pub fn track_event(&mut self, name: &str, data: Value) {
        self.recorder.record(EventData::Custom(CustomData {
            name: name.to_string(),
            data,
        }));
    }

    /// Events buffered and not yet sent.
    pub fn pending_events(&self) -> usize {
        self.recorder.pending()
    }

    pub fn is_idle(&self) -> bool {
        self.idle.is_idle()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}
