//! Hotspot tracker - client-side interaction capture, batching and delivery.
//!
//! The page environment is reached only through the [`Host`], [`DomNode`]
//! and [`Transport`] traits, so the same tracker runs inside a browser
//! binding, a native simulator or a unit test. [`ScriptedHost`],
//! [`VirtualNode`] and [`MemoryTransport`] are the in-memory implementations.

pub mod detectors;
pub mod dom;
pub mod element;
pub mod host;
#[cfg(feature = "http")]
pub mod http;
pub mod navigation;
pub mod recorder;
pub mod tracker;
pub mod transmitter;

pub use detectors::{
    ErrorReport, IntersectionEntry, LayoutShiftEntry, NavigationTiming, PointerInput,
};
pub use dom::{DomNode, VirtualNode};
pub use element::{describe, selector};
pub use host::{DeviceInfo, Host, Location, ScriptedHost};
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use navigation::{HistoryApi, HistoryInterceptor, NavigationCause};
pub use recorder::{EventRecorder, Record};
pub use tracker::{generate_session_id, Tracker};
pub use transmitter::{BeaconOutcome, Delivery, MemoryTransport, Transmitter, Transport};
