//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use hotspot_core::config::ServerConfig;
use hotspot_store::AnalyticsStore;

/// Shared application state, cloned into every handler task.
#[derive(Clone)]
pub struct AppState {
    /// Event log, session table and aggregations.
    pub store: Arc<AnalyticsStore>,
    /// Bind address, body limit, rate limit and CORS origins.
    pub server: Arc<ServerConfig>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(server: ServerConfig, store: AnalyticsStore) -> Self {
        Self {
            store: Arc::new(store),
            server: Arc::new(server),
            start_time: Instant::now(),
        }
    }
}
