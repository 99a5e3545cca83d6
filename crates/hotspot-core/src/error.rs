use thiserror::Error;

/// Top-level error type for the Hotspot pipeline.
///
/// Shared by the tracker, the store and the API so that `?` works across
/// crate boundaries. The tracker never lets one of these reach the host page;
/// they are logged and dropped at the detector / transmitter boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HotspotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HotspotError {
    fn from(err: toml::de::Error) -> Self {
        HotspotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HotspotError {
    fn from(err: toml::ser::Error) -> Self {
        HotspotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HotspotError {
    fn from(err: serde_json::Error) -> Self {
        HotspotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Hotspot operations.
pub type Result<T> = std::result::Result<T, HotspotError>;
