use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HotspotError, Result};

/// Top-level configuration for the Hotspot service and tracker.
///
/// Loaded from `~/.hotspot/config.toml` by default. Each section is optional
/// in the file; missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotspotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl HotspotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HotspotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| HotspotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Ingestion server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
    /// Maximum accepted request body.
    pub body_limit_bytes: usize,
    /// Requests per second accepted on the tracking routes.
    pub rate_limit_per_sec: u64,
    /// CORS origins. Empty means any origin, since the tracker is embedded on
    /// arbitrary sites.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4040,
            body_limit_bytes: 2 * 1024 * 1024,
            rate_limit_per_sec: 200,
            allowed_origins: Vec::new(),
        }
    }
}

/// Which storage backend holds the event log and session table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Volatile, capped in-memory log.
    #[default]
    Memory,
    /// SQLite file.
    Sqlite,
}

impl std::str::FromStr for BackendKind {
    type Err = HotspotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(HotspotError::Config(format!(
                "Unknown storage backend '{}'. Must be one of: memory, sqlite",
                other
            ))),
        }
    }
}

/// Aggregation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Event log capacity. Reaching it evicts the oldest half of the log.
    pub max_events: usize,
    /// Database file for the SQLite backend.
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            max_events: 100_000,
            sqlite_path: "hotspot.db".to_string(),
        }
    }
}

/// Client-side tracker settings.
///
/// Read once when a tracker is constructed and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Ingestion endpoint URL.
    pub endpoint: String,
    /// Identity attached to every event.
    pub user_id: String,
    /// Record mouse trails (session replay data).
    pub session_capture: bool,
    /// DOM snapshot interval; 0 disables snapshots.
    pub snapshot_interval_ms: u64,
    /// Master switch for DOM snapshots.
    pub capture_snapshots: bool,
    pub flush_interval_ms: u64,
    pub mouse_sample_ms: u64,
    pub scroll_sample_ms: u64,
    pub rage_click_threshold: usize,
    pub rage_click_window_ms: u64,
    pub rage_click_tolerance_px: f64,
    pub idle_timeout_ms: u64,
    pub idle_check_interval_ms: u64,
    /// Upper bound on events per transmitted batch.
    pub max_batch_size: usize,
    /// Trail points accumulated before a `mouse_trail` event is emitted.
    pub mouse_trail_points: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: "/api/tracking".to_string(),
            user_id: "anonymous".to_string(),
            session_capture: true,
            snapshot_interval_ms: 30_000,
            capture_snapshots: true,
            flush_interval_ms: 5_000,
            mouse_sample_ms: 100,
            scroll_sample_ms: 250,
            rage_click_threshold: 3,
            rage_click_window_ms: 1_000,
            rage_click_tolerance_px: 50.0,
            idle_timeout_ms: 60_000,
            idle_check_interval_ms: 10_000,
            max_batch_size: 500,
            mouse_trail_points: 50,
        }
    }
}

impl TrackerConfig {
    /// Build a config from script-tag style embedding attributes.
    ///
    /// `lookup` returns the raw value of an attribute such as `data-endpoint`.
    /// Boolean flags are on unless the attribute is literally `"false"`; an
    /// interval that does not parse keeps its default.
    pub fn from_attributes<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("data-endpoint").filter(|v| !v.is_empty()) {
            config.endpoint = endpoint;
        }
        if let Some(user_id) = lookup("data-user-id").filter(|v| !v.is_empty()) {
            config.user_id = user_id;
        }
        config.session_capture = lookup("data-session-capture").as_deref() != Some("false");
        config.capture_snapshots = lookup("data-screenshots").as_deref() != Some("false");
        if let Some(raw) = lookup("data-screenshot-interval") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.snapshot_interval_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring unparsable snapshot interval"),
            }
        }

        config
    }

    /// Whether periodic DOM snapshots should run at all.
    pub fn snapshots_enabled(&self) -> bool {
        self.capture_snapshots && self.snapshot_interval_ms > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = HotspotConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.port, 4040);
        assert!(config.server.allowed_origins.is_empty());
        assert_eq!(config.store.backend, BackendKind::Memory);
        assert_eq!(config.store.max_events, 100_000);
        assert_eq!(config.tracker.flush_interval_ms, 5_000);
        assert_eq!(config.tracker.max_batch_size, 500);
    }

    #[test]
    fn test_tracker_defaults_match_embedding_contract() {
        let tracker = TrackerConfig::default();
        assert_eq!(tracker.mouse_sample_ms, 100);
        assert_eq!(tracker.scroll_sample_ms, 250);
        assert_eq!(tracker.rage_click_threshold, 3);
        assert_eq!(tracker.rage_click_window_ms, 1_000);
        assert!((tracker.rage_click_tolerance_px - 50.0).abs() < f64::EPSILON);
        assert_eq!(tracker.idle_timeout_ms, 60_000);
        assert_eq!(tracker.idle_check_interval_ms, 10_000);
        assert_eq!(tracker.mouse_trail_points, 50);
        assert!(tracker.snapshots_enabled());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[server]
port = 9000

[store]
backend = "sqlite"
sqlite_path = "/tmp/events.db"

[tracker]
max_batch_size = 100
"#;
        let file = create_temp_config(content);
        let config = HotspotConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.backend, BackendKind::Sqlite);
        assert_eq!(config.store.sqlite_path, "/tmp/events.db");
        assert_eq!(config.tracker.max_batch_size, 100);
        assert_eq!(config.tracker.flush_interval_ms, 5_000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(HotspotConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = HotspotConfig::load_or_default(Path::new("/nonexistent/hotspot.toml"));
        assert_eq!(config.server.port, 4040);
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = HotspotConfig::default();
        config.tracker.user_id = "employee-123".to_string();
        config.save(&path).unwrap();

        let reloaded = HotspotConfig::load(&path).unwrap();
        assert_eq!(reloaded.tracker, config.tracker);
        assert_eq!(reloaded.store.backend, BackendKind::Memory);
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("SQLite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert!("postgres".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_from_attributes() {
        let attrs: HashMap<&str, &str> = [
            ("data-endpoint", "https://collect.example.com/api/tracking"),
            ("data-user-id", "employee-123"),
            ("data-session-capture", "true"),
            ("data-screenshot-interval", "0"),
        ]
        .into_iter()
        .collect();

        let config = TrackerConfig::from_attributes(|name| attrs.get(name).map(|v| v.to_string()));
        assert_eq!(config.endpoint, "https://collect.example.com/api/tracking");
        assert_eq!(config.user_id, "employee-123");
        assert!(config.session_capture);
        assert!(config.capture_snapshots);
        assert_eq!(config.snapshot_interval_ms, 0);
        assert!(!config.snapshots_enabled());
    }

    #[test]
    fn test_from_attributes_flags_only_disabled_by_literal_false() {
        let attrs: HashMap<&str, &str> = [
            ("data-session-capture", "false"),
            ("data-screenshots", "no"),
            ("data-screenshot-interval", "soon"),
        ]
        .into_iter()
        .collect();

        let config = TrackerConfig::from_attributes(|name| attrs.get(name).map(|v| v.to_string()));
        assert!(!config.session_capture);
        assert!(config.capture_snapshots);
        assert_eq!(config.snapshot_interval_ms, 30_000);
        assert_eq!(config.endpoint, "/api/tracking");
        assert_eq!(config.user_id, "anonymous");
    }
}
