pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::{BackendKind, HotspotConfig, TrackerConfig};
pub use error::{HotspotError, Result};
pub use events::{Batch, EventData, EventKind, TrackingEvent};
pub use types::*;
