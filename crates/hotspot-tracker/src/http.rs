//! HTTP delivery for native hosts.

use std::cell::RefCell;

use hotspot_core::{HotspotError, Result};
use reqwest::header::CONTENT_TYPE;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::transmitter::{BeaconOutcome, Transport};

/// Posts batches with reqwest on the ambient tokio runtime.
///
/// Native hosts have no beacon channel, so every batch takes the fallback
/// path. Requests are spawned and not awaited; [`HttpTransport::settle`]
/// waits for the ones still in flight.
pub struct HttpTransport {
    client: reqwest::Client,
    in_flight: RefCell<Vec<JoinHandle<()>>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            in_flight: RefCell::new(Vec::new()),
        }
    }

    /// Wait for every request still in flight.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.in_flight.borrow_mut());
        for handle in handles {
            if let Err(e) = handle.await {
                debug!(error = %e, "Delivery task aborted");
            }
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn beacon(&self, _endpoint: &str, _body: &[u8]) -> BeaconOutcome {
        BeaconOutcome::Unavailable
    }

    fn send(&self, endpoint: &str, body: Vec<u8>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HotspotError::Transport(format!("no async runtime: {e}")))?;

        let request = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        let endpoint = endpoint.to_string();

        let handle = runtime.spawn(async move {
            match request.send().await {
                Ok(resp) if !resp.status().is_success() => {
                    debug!(endpoint = %endpoint, status = %resp.status(), "Batch rejected");
                }
                Ok(_) => {}
                Err(e) => debug!(endpoint = %endpoint, error = %e, "Batch request failed"),
            }
        });
        let mut in_flight = self.in_flight.borrow_mut();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
        Ok(())
    }
}
