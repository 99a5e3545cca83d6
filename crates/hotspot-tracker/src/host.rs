//! The page environment the tracker observes.
//!
//! A browser embedding implements [`Host`] over `window`/`document`; tests and
//! the simulator use [`ScriptedHost`], whose clock and location are driven by
//! the caller.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hotspot_core::types::{EpochMillis, ViewportSnapshot};
use hotspot_core::{HotspotError, Result};

use crate::navigation::HistoryApi;

/// Current document location, split the way the tracker needs it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub href: String,
    pub pathname: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

impl Location {
    /// Split an absolute or root-relative URL into path and hash.
    pub fn parse(href: &str) -> Self {
        if let Ok(parsed) = url::Url::parse(href) {
            return Self {
                href: href.to_string(),
                pathname: parsed.path().to_string(),
                hash: parsed
                    .fragment()
                    .map(|f| format!("#{f}"))
                    .unwrap_or_default(),
            };
        }

        let (before_hash, hash) = match href.find('#') {
            Some(idx) => (&href[..idx], href[idx..].to_string()),
            None => (href, String::new()),
        };
        let path = before_hash.split('?').next().unwrap_or_default();
        Self {
            href: href.to_string(),
            pathname: if path.is_empty() { "/".to_string() } else { path.to_string() },
            hash,
        }
    }

    /// Route key used for SPA change detection.
    pub fn route(&self) -> String {
        format!("{}{}", self.pathname, self.hash)
    }
}

/// Static facts about the device, sent with every batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub language: String,
    pub platform: String,
    pub timezone: String,
}

impl DeviceInfo {
    pub fn screen_resolution(&self) -> String {
        format!("{}x{}", self.screen_width, self.screen_height)
    }
}

/// Everything the tracker reads from its surroundings.
///
/// Implementations must be cheap to call; detectors query the host on every
/// recorded event.
pub trait Host {
    /// Wall clock in epoch milliseconds.
    fn now_ms(&self) -> EpochMillis;

    fn location(&self) -> Location;

    fn viewport(&self) -> ViewportSnapshot;

    fn document_title(&self) -> String;

    fn referrer(&self) -> String;

    fn device(&self) -> DeviceInfo;

    /// Full markup of the current document.
    fn serialize_document(&self) -> Result<String>;
}

/// A host whose state is set explicitly by the caller.
#[derive(Debug)]
pub struct ScriptedHost {
    now: Cell<EpochMillis>,
    location: RefCell<Location>,
    viewport: RefCell<ViewportSnapshot>,
    title: RefCell<String>,
    referrer: String,
    device: DeviceInfo,
    document: RefCell<Option<String>>,
}

impl ScriptedHost {
    pub fn new(start_ms: EpochMillis, href: &str) -> Self {
        Self {
            now: Cell::new(start_ms),
            location: RefCell::new(Location::parse(href)),
            viewport: RefCell::new(ViewportSnapshot {
                width: 1280.0,
                height: 720.0,
                doc_width: 1280.0,
                doc_height: 720.0,
                ..Default::default()
            }),
            title: RefCell::new(String::new()),
            referrer: String::new(),
            device: DeviceInfo {
                user_agent: "hotspot-scripted/0.1".to_string(),
                screen_width: 1920,
                screen_height: 1080,
                language: "en-US".to_string(),
                platform: std::env::consts::OS.to_string(),
                timezone: "UTC".to_string(),
            },
            document: RefCell::new(Some("<html><body></body></html>".to_string())),
        }
    }

    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = device;
        self
    }

    pub fn with_referrer(mut self, referrer: &str) -> Self {
        self.referrer = referrer.to_string();
        self
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set_now(&self, ms: EpochMillis) {
        self.now.set(ms);
    }

    pub fn navigate(&self, href: &str) {
        *self.location.borrow_mut() = Location::parse(href);
    }

    pub fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_string();
    }

    pub fn set_viewport(&self, viewport: ViewportSnapshot) {
        *self.viewport.borrow_mut() = viewport;
    }

    pub fn scroll_to(&self, scroll_y: f64) {
        self.viewport.borrow_mut().scroll_y = scroll_y;
    }

    /// `None` makes document serialization fail.
    pub fn set_document(&self, markup: Option<String>) {
        *self.document.borrow_mut() = markup;
    }
}

impl Host for ScriptedHost {
    fn now_ms(&self) -> EpochMillis {
        self.now.get()
    }

    fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    fn viewport(&self) -> ViewportSnapshot {
        self.viewport.borrow().clone()
    }

    fn document_title(&self) -> String {
        self.title.borrow().clone()
    }

    fn referrer(&self) -> String {
        self.referrer.clone()
    }

    fn device(&self) -> DeviceInfo {
        self.device.clone()
    }

    fn serialize_document(&self) -> Result<String> {
        self.document
            .borrow()
            .clone()
            .ok_or_else(|| HotspotError::Capture("document unavailable".to_string()))
    }
}

impl HistoryApi for Rc<ScriptedHost> {
    fn push_state(&mut self, url: &str) {
        self.navigate(url);
    }

    fn replace_state(&mut self, url: &str) {
        self.navigate(url);
    }
}
