//! Fixed-window, per-client rate limiter for the tracking routes.
//!
//! Requests are counted per client per wall-clock second. The first request
//! of a new second drops every count from the previous one, so the table
//! only holds clients seen this second. A limit of 0 disables limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, Extension, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Default)]
struct Window {
    second: u64,
    counts: HashMap<String, u64>,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_per_sec: u64,
    window: Arc<Mutex<Window>>,
}

impl RateLimiter {
    pub fn new(max_per_sec: u64) -> Self {
        Self {
            max_per_sec,
            window: Arc::new(Mutex::new(Window::default())),
        }
    }

    fn try_acquire(&self, client: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(client, now)
    }

    /// Admit one request from `client` in the window `now_secs`.
    pub(crate) fn try_acquire_at(&self, client: &str, now_secs: u64) -> bool {
        if self.max_per_sec == 0 {
            return true;
        }

        let mut window = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if window.second != now_secs {
            window.second = now_secs;
            window.counts.clear();
        }

        let count = window.counts.entry(client.to_string()).or_insert(0);
        *count += 1;
        *count <= self.max_per_sec
    }
}

/// First hop of `X-Forwarded-For`, else the peer address, else a shared
/// bucket.
fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());
    if let Some(hop) = forwarded {
        return hop.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware that rejects a client's requests over the limit with 429.
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    if limiter.try_acquire(&client) {
        next.run(req).await
    } else {
        warn!(client = %client, path = %req.uri().path(), "Rate limit exceeded");
        ApiError::TooManyRequests("Rate limit exceeded".to_string()).into_response()
    }
}
