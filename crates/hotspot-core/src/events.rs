use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::{ElementMeta, EpochMillis, TrailPoint, ViewportSnapshot};

// =============================================================================
// Event kinds
// =============================================================================

/// Discriminator carried in the `type` field of every event.
///
/// Open-ended: a kind this build does not know is kept as `Other` and stored
/// verbatim instead of being rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    PageView,
    PageExit,
    Click,
    RageClick,
    MouseTrail,
    Scroll,
    FormFocus,
    FormBlur,
    Visibility,
    IdleStart,
    IdleEnd,
    JsError,
    Performance,
    WebVital,
    DomSnapshot,
    ElementVisible,
    Custom,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::SessionStart => "session_start",
            EventKind::SessionEnd => "session_end",
            EventKind::PageView => "page_view",
            EventKind::PageExit => "page_exit",
            EventKind::Click => "click",
            EventKind::RageClick => "rage_click",
            EventKind::MouseTrail => "mouse_trail",
            EventKind::Scroll => "scroll",
            EventKind::FormFocus => "form_focus",
            EventKind::FormBlur => "form_blur",
            EventKind::Visibility => "visibility",
            EventKind::IdleStart => "idle_start",
            EventKind::IdleEnd => "idle_end",
            EventKind::JsError => "js_error",
            EventKind::Performance => "performance",
            EventKind::WebVital => "web_vital",
            EventKind::DomSnapshot => "dom_snapshot",
            EventKind::ElementVisible => "element_visible",
            EventKind::Custom => "custom",
            EventKind::Other(name) => name,
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        match value {
            "session_start" => EventKind::SessionStart,
            "session_end" => EventKind::SessionEnd,
            "page_view" => EventKind::PageView,
            "page_exit" => EventKind::PageExit,
            "click" => EventKind::Click,
            "rage_click" => EventKind::RageClick,
            "mouse_trail" => EventKind::MouseTrail,
            "scroll" => EventKind::Scroll,
            "form_focus" => EventKind::FormFocus,
            "form_blur" => EventKind::FormBlur,
            "visibility" => EventKind::Visibility,
            "idle_start" => EventKind::IdleStart,
            "idle_end" => EventKind::IdleEnd,
            "js_error" => EventKind::JsError,
            "performance" => EventKind::Performance,
            "web_vital" => EventKind::WebVital,
            "dom_snapshot" => EventKind::DomSnapshot,
            "element_visible" => EventKind::ElementVisible,
            "custom" => EventKind::Custom,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        EventKind::from(value.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStartData {
    pub url: String,
    pub referrer: String,
    pub user_agent: String,
    pub screen: String,
    pub viewport: ViewportSnapshot,
    pub timezone: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionEndData {
    pub duration: i64,
    pub page_view_count: u32,
    pub max_scroll_depth: u32,
    pub final_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageViewData {
    pub url: String,
    pub path: String,
    pub title: String,
    pub referrer: String,
    pub page_view_number: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageExitData {
    /// URL of the page being left.
    pub url: String,
    pub time_on_page: i64,
    pub max_scroll_depth: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickData {
    pub x: f64,
    pub y: f64,
    /// Page coordinates; clicks without them are left out of heatmaps.
    pub page_x: Option<f64>,
    pub page_y: Option<f64>,
    pub button: i16,
    pub element: Option<ElementMeta>,
    pub timestamp: EpochMillis,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RageClickData {
    /// Centroid of the burst, viewport coordinates.
    pub x: f64,
    pub y: f64,
    pub click_count: u32,
    pub element: Option<ElementMeta>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseTrailData {
    pub points: Vec<TrailPoint>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollData {
    pub scroll_y: f64,
    pub scroll_percent: Option<u32>,
    /// Max depth reached so far in the current page view.
    pub max_depth: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormFocusData {
    pub element: Option<ElementMeta>,
    pub field_type: String,
    pub field_name: Option<String>,
}

/// Form blur. Only whether the field held a value is captured, never the value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormBlurData {
    pub element: Option<ElementMeta>,
    pub field_type: String,
    pub field_name: Option<String>,
    pub has_value: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityData {
    pub hidden: bool,
    pub state: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdleStartData {
    pub idle_after: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdleEndData {
    pub idle_duration: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsErrorData {
    pub message: String,
    pub filename: Option<String>,
    pub line: Option<u32>,
    pub col: Option<u32>,
    /// First 500 characters of the stack trace.
    pub stack: Option<String>,
}

/// Navigation timing deltas in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceData {
    pub dns: i64,
    pub tcp: i64,
    pub ttfb: i64,
    pub dom_load: i64,
    pub full_load: i64,
    pub dom_interactive: i64,
    pub transfer_size: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalName {
    #[default]
    #[serde(rename = "LCP")]
    Lcp,
    #[serde(rename = "FID")]
    Fid,
    #[serde(rename = "CLS")]
    Cls,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebVitalData {
    pub name: VitalName,
    pub value: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSnapshotData {
    /// First 50 000 characters of the serialized markup.
    pub snapshot: String,
    pub url: String,
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementVisibleData {
    pub element: Option<ElementMeta>,
    pub visible_percent: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomData {
    pub name: String,
    pub data: Value,
}

/// Typed per-kind payload.
///
/// `Unrecognized` keeps a payload whose shape did not match its kind (or whose
/// kind is unknown) so it is stored verbatim rather than dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    SessionStart(SessionStartData),
    SessionEnd(SessionEndData),
    PageView(PageViewData),
    PageExit(PageExitData),
    Click(ClickData),
    RageClick(RageClickData),
    MouseTrail(MouseTrailData),
    Scroll(ScrollData),
    FormFocus(FormFocusData),
    FormBlur(FormBlurData),
    Visibility(VisibilityData),
    IdleStart(IdleStartData),
    IdleEnd(IdleEndData),
    JsError(JsErrorData),
    Performance(PerformanceData),
    WebVital(WebVitalData),
    DomSnapshot(DomSnapshotData),
    ElementVisible(ElementVisibleData),
    Custom(CustomData),
    Unrecognized { kind: EventKind, raw: Value },
}

impl EventData {
    pub fn kind(&self) -> EventKind {
        match self {
            EventData::SessionStart(_) => EventKind::SessionStart,
            EventData::SessionEnd(_) => EventKind::SessionEnd,
            EventData::PageView(_) => EventKind::PageView,
            EventData::PageExit(_) => EventKind::PageExit,
            EventData::Click(_) => EventKind::Click,
            EventData::RageClick(_) => EventKind::RageClick,
            EventData::MouseTrail(_) => EventKind::MouseTrail,
            EventData::Scroll(_) => EventKind::Scroll,
            EventData::FormFocus(_) => EventKind::FormFocus,
            EventData::FormBlur(_) => EventKind::FormBlur,
            EventData::Visibility(_) => EventKind::Visibility,
            EventData::IdleStart(_) => EventKind::IdleStart,
            EventData::IdleEnd(_) => EventKind::IdleEnd,
            EventData::JsError(_) => EventKind::JsError,
            EventData::Performance(_) => EventKind::Performance,
            EventData::WebVital(_) => EventKind::WebVital,
            EventData::DomSnapshot(_) => EventKind::DomSnapshot,
            EventData::ElementVisible(_) => EventKind::ElementVisible,
            EventData::Custom(_) => EventKind::Custom,
            EventData::Unrecognized { kind, .. } => kind.clone(),
        }
    }

    /// Decode a raw `data` object for the given kind.
    ///
    /// Never fails: a shape mismatch is logged and kept as `Unrecognized`.
    pub fn from_raw(kind: EventKind, raw: Value) -> Self {
        // A missing payload decodes like an empty object.
        let source = if raw.is_null() {
            Value::Object(Default::default())
        } else {
            raw.clone()
        };

        let decoded = match &kind {
            EventKind::Other(_) => None,
            EventKind::SessionStart => Some(decode(source, EventData::SessionStart)),
            EventKind::SessionEnd => Some(decode(source, EventData::SessionEnd)),
            EventKind::PageView => Some(decode(source, EventData::PageView)),
            EventKind::PageExit => Some(decode(source, EventData::PageExit)),
            EventKind::Click => Some(decode(source, EventData::Click)),
            EventKind::RageClick => Some(decode(source, EventData::RageClick)),
            EventKind::MouseTrail => Some(decode(source, EventData::MouseTrail)),
            EventKind::Scroll => Some(decode(source, EventData::Scroll)),
            EventKind::FormFocus => Some(decode(source, EventData::FormFocus)),
            EventKind::FormBlur => Some(decode(source, EventData::FormBlur)),
            EventKind::Visibility => Some(decode(source, EventData::Visibility)),
            EventKind::IdleStart => Some(decode(source, EventData::IdleStart)),
            EventKind::IdleEnd => Some(decode(source, EventData::IdleEnd)),
            EventKind::JsError => Some(decode(source, EventData::JsError)),
            EventKind::Performance => Some(decode(source, EventData::Performance)),
            EventKind::WebVital => Some(decode(source, EventData::WebVital)),
            EventKind::DomSnapshot => Some(decode(source, EventData::DomSnapshot)),
            EventKind::ElementVisible => Some(decode(source, EventData::ElementVisible)),
            EventKind::Custom => Some(decode(source, EventData::Custom)),
        };

        match decoded {
            None => EventData::Unrecognized { kind, raw },
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                warn!(
                    kind = %kind,
                    error = %e,
                    "Event payload did not match its kind, keeping raw"
                );
                EventData::Unrecognized { kind, raw }
            }
        }
    }

    /// The payload as a JSON value, in wire shape.
    pub fn to_raw(&self) -> Value {
        let encoded = match self {
            EventData::SessionStart(d) => serde_json::to_value(d),
            EventData::SessionEnd(d) => serde_json::to_value(d),
            EventData::PageView(d) => serde_json::to_value(d),
            EventData::PageExit(d) => serde_json::to_value(d),
            EventData::Click(d) => serde_json::to_value(d),
            EventData::RageClick(d) => serde_json::to_value(d),
            EventData::MouseTrail(d) => serde_json::to_value(d),
            EventData::Scroll(d) => serde_json::to_value(d),
            EventData::FormFocus(d) => serde_json::to_value(d),
            EventData::FormBlur(d) => serde_json::to_value(d),
            EventData::Visibility(d) => serde_json::to_value(d),
            EventData::IdleStart(d) => serde_json::to_value(d),
            EventData::IdleEnd(d) => serde_json::to_value(d),
            EventData::JsError(d) => serde_json::to_value(d),
            EventData::Performance(d) => serde_json::to_value(d),
            EventData::WebVital(d) => serde_json::to_value(d),
            EventData::DomSnapshot(d) => serde_json::to_value(d),
            EventData::ElementVisible(d) => serde_json::to_value(d),
            EventData::Custom(d) => serde_json::to_value(d),
            EventData::Unrecognized { raw, .. } => return raw.clone(),
        };
        encoded.unwrap_or_default()
    }
}

fn decode<T: DeserializeOwned>(
    raw: Value,
    wrap: fn(T) -> EventData,
) -> Result<EventData, serde_json::Error> {
    serde_json::from_value(raw).map(wrap)
}

// =============================================================================
// Events and batches
// =============================================================================

/// A single tracked event. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEvent", into = "WireEvent")]
pub struct TrackingEvent {
    pub timestamp: EpochMillis,
    pub session_id: String,
    pub user_id: String,
    pub url: String,
    pub path: String,
    pub viewport: ViewportSnapshot,
    pub data: EventData,
}

impl TrackingEvent {
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

/// Wire shape of an event: `{type, timestamp, sessionId, ..., data}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(rename = "type")]
    kind: EventKind,
    timestamp: EpochMillis,
    session_id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    viewport: ViewportSnapshot,
    #[serde(default)]
    data: Value,
}

impl From<WireEvent> for TrackingEvent {
    fn from(wire: WireEvent) -> Self {
        Self {
            timestamp: wire.timestamp,
            session_id: wire.session_id,
            user_id: wire.user_id,
            url: wire.url,
            path: wire.path,
            viewport: wire.viewport,
            data: EventData::from_raw(wire.kind, wire.data),
        }
    }
}

impl From<TrackingEvent> for WireEvent {
    fn from(event: TrackingEvent) -> Self {
        Self {
            kind: event.data.kind(),
            data: event.data.to_raw(),
            timestamp: event.timestamp,
            session_id: event.session_id,
            user_id: event.user_id,
            url: event.url,
            path: event.path,
            viewport: event.viewport,
        }
    }
}

/// Unit of network transmission from the tracker to the ingestion endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub session_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub screen_resolution: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub platform: String,
    pub timestamp: EpochMillis,
    pub events: Vec<TrackingEvent>,
}
