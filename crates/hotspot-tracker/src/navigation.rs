//! Page views and SPA route changes.
//!
//! History mutations go through [`HistoryInterceptor`], which calls the
//! wrapped history first and then notifies subscribers. Subscribers re-read
//! the location and emit `page_exit` / `page_view` only when the route
//! (path plus hash) actually changed.

use hotspot_core::events::{EventData, PageExitData, PageViewData};
use hotspot_core::types::EpochMillis;

use crate::host::Host;
use crate::recorder::Record;

/// The host's session history.
pub trait HistoryApi {
    fn push_state(&mut self, url: &str);
    fn replace_state(&mut self, url: &str);
}

/// What caused a navigation notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationCause {
    Push,
    Replace,
    Pop,
}

type Subscriber = Box<dyn FnMut(NavigationCause)>;

/// Wraps a [`HistoryApi`] and reports every mutation after it is applied.
pub struct HistoryInterceptor<H> {
    inner: H,
    subscribers: Vec<Subscriber>,
}

impl<H: HistoryApi> HistoryInterceptor<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(NavigationCause) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn push_state(&mut self, url: &str) {
        self.inner.push_state(url);
        self.notify(NavigationCause::Push);
    }

    pub fn replace_state(&mut self, url: &str) {
        self.inner.replace_state(url);
        self.notify(NavigationCause::Replace);
    }

    /// Forward a host `popstate` notification.
    pub fn pop_state(&mut self) {
        self.notify(NavigationCause::Pop);
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn notify(&mut self, cause: NavigationCause) {
        for subscriber in &mut self.subscribers {
            subscriber(cause);
        }
    }
}

/// Page-view bookkeeping for the current document.
#[derive(Debug)]
pub struct NavigationDetector {
    route: String,
    page_url: String,
    page_started_at: EpochMillis,
    page_views: u32,
}

impl NavigationDetector {
    pub fn new(host: &dyn Host) -> Self {
        let location = host.location();
        Self {
            route: location.route(),
            page_url: location.href,
            page_started_at: host.now_ms(),
            page_views: 0,
        }
    }

    pub fn page_views(&self) -> u32 {
        self.page_views
    }

    /// Emit `page_view` for the current location.
    pub fn track_page_view(&mut self, host: &dyn Host, rec: &mut dyn Record) {
        let location = host.location();
        self.page_views += 1;
        self.route = location.route();
        self.page_url = location.href.clone();
        self.page_started_at = host.now_ms();

        rec.record(EventData::PageView(PageViewData {
            url: location.href,
            path: location.pathname,
            title: host.document_title(),
            referrer: host.referrer(),
            page_view_number: self.page_views,
        }));
    }

    /// Returns true when the route changed and a new page view began.
    ///
    /// `max_scroll_depth` is the outgoing page's depth; callers reset their
    /// scroll tracking when this returns true.
    pub fn check(&mut self, host: &dyn Host, max_scroll_depth: u32, rec: &mut dyn Record) -> bool {
        let route = host.location().route();
        if route == self.route {
            return false;
        }

        rec.record(EventData::PageExit(PageExitData {
            url: self.page_url.clone(),
            time_on_page: host.now_ms() - self.page_started_at,
            max_scroll_depth,
        }));
        self.track_page_view(host, rec);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ScriptedHost;
    use crate::recorder::CollectingRecorder;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_interceptor_calls_inner_before_notifying() {
        let host = Rc::new(ScriptedHost::new(0, "https://a.test/"));
        let mut history = HistoryInterceptor::new(Rc::clone(&host));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let observed_host = Rc::clone(&host);
        let log = Rc::clone(&seen);
        history.subscribe(move |cause| {
            log.borrow_mut()
                .push((cause, observed_host.location().pathname));
        });

        history.push_state("/pricing");
        history.replace_state("/pricing?plan=pro");
        history.pop_state();

        assert_eq!(
            *seen.borrow(),
            vec![
                (NavigationCause::Push, "/pricing".to_string()),
                (NavigationCause::Replace, "/pricing".to_string()),
                (NavigationCause::Pop, "/pricing".to_string()),
            ]
        );
    }

    #[test]
    fn test_route_change_emits_exit_then_view() {
        let host = ScriptedHost::new(1_000, "https://a.test/");
        let mut nav = NavigationDetector::new(&host);
        let mut rec = CollectingRecorder::default();
        nav.track_page_view(&host, &mut rec);

        host.advance(4_000);
        host.navigate("https://a.test/pricing");
        assert!(nav.check(&host, 60, &mut rec));

        match &rec.events[1] {
            EventData::PageExit(exit) => {
                assert_eq!(exit.url, "https://a.test/");
                assert_eq!(exit.time_on_page, 4_000);
                assert_eq!(exit.max_scroll_depth, 60);
            }
            other => panic!("expected page_exit, got {other:?}"),
        }
        match &rec.events[2] {
            EventData::PageView(view) => {
                assert_eq!(view.path, "/pricing");
                assert_eq!(view.page_view_number, 2);
            }
            other => panic!("expected page_view, got {other:?}"),
        }
    }

    #[test]
    fn test_time_on_page_measured_per_page() {
        let host = ScriptedHost::new(0, "https://a.test/a");
        let mut nav = NavigationDetector::new(&host);
        let mut rec = CollectingRecorder::default();
        nav.track_page_view(&host, &mut rec);

        host.advance(1_000);
        host.navigate("https://a.test/b");
        nav.check(&host, 0, &mut rec);
        host.advance(2_500);
        host.navigate("https://a.test/c");
        nav.check(&host, 0, &mut rec);

        let times: Vec<i64> = rec
            .events
            .iter()
            .filter_map(|e| match e {
                EventData::PageExit(x) => Some(x.time_on_page),
                _ => None,
            })
            .collect();
        assert_eq!(times, vec![1_000, 2_500]);
    }

    #[test]
    fn test_query_only_change_is_ignored() {
        let host = ScriptedHost::new(0, "https://a.test/list");
        let mut nav = NavigationDetector::new(&host);
        let mut rec = CollectingRecorder::default();
        host.navigate("https://a.test/list?page=2");
        assert!(!nav.check(&host, 0, &mut rec));

        host.navigate("https://a.test/list?page=2#reviews");
        assert!(nav.check(&host, 0, &mut rec));
        assert_eq!(rec.events.len(), 2);
    }
}
