//! Batch delivery.
//!
//! Each batch is offered to the host's unload-safe beacon first and falls
//! back to a fire-and-forget request. Delivery failures are logged and the
//! batch is dropped; nothing is retried.

use std::cell::RefCell;
use std::rc::Rc;

use hotspot_core::events::Batch;
use hotspot_core::{HotspotError, Result};
use tracing::debug;

/// Result of offering a payload to the beacon channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeaconOutcome {
    /// Queued for delivery by the host.
    Sent,
    /// The host refused the payload (for example, over its size quota).
    Rejected,
    /// No beacon channel exists on this host.
    Unavailable,
}

/// Outbound channel to the ingestion endpoint.
pub trait Transport {
    fn beacon(&self, endpoint: &str, body: &[u8]) -> BeaconOutcome;

    /// Start a POST with `Content-Type: application/json`. Must not block on
    /// the response.
    fn send(&self, endpoint: &str, body: Vec<u8>) -> Result<()>;
}

/// Which path a batch took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Beacon,
    Fallback,
    Dropped,
}

pub struct Transmitter {
    endpoint: String,
    transport: Rc<dyn Transport>,
}

impl Transmitter {
    pub fn new(endpoint: impl Into<String>, transport: Rc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    pub fn deliver(&self, batch: &Batch) -> Delivery {
        let body = match serde_json::to_vec(batch) {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "Failed to encode batch");
                return Delivery::Dropped;
            }
        };

        match self.transport.beacon(&self.endpoint, &body) {
            BeaconOutcome::Sent => return Delivery::Beacon,
            BeaconOutcome::Rejected | BeaconOutcome::Unavailable => {}
        }

        match self.transport.send(&self.endpoint, body) {
            Ok(()) => Delivery::Fallback,
            Err(e) => {
                debug!(
                    error = %e,
                    events = batch.events.len(),
                    "Batch delivery failed"
                );
                Delivery::Dropped
            }
        }
    }
}

/// Keeps every payload in memory instead of sending it.
///
/// Used for offline runs and to feed batches straight into an in-process
/// store.
#[derive(Debug)]
pub struct MemoryTransport {
    beacon: BeaconOutcome,
    fail_send: bool,
    sent: RefCell<Vec<Vec<u8>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            beacon: BeaconOutcome::Sent,
            fail_send: false,
            sent: RefCell::new(Vec::new()),
        }
    }

    /// Answer every beacon with `outcome`.
    pub fn with_beacon(mut self, outcome: BeaconOutcome) -> Self {
        self.beacon = outcome;
        self
    }

    /// Make the fallback request fail.
    pub fn failing(mut self) -> Self {
        self.fail_send = true;
        self
    }

    /// Remove and return every payload captured so far.
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }

    /// Captured payloads decoded as batches; undecodable ones are skipped.
    pub fn take_batches(&self) -> Vec<Batch> {
        self.take()
            .iter()
            .filter_map(|body| serde_json::from_slice(body).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn beacon(&self, _endpoint: &str, body: &[u8]) -> BeaconOutcome {
        if self.beacon == BeaconOutcome::Sent {
            self.sent.borrow_mut().push(body.to_vec());
        }
        self.beacon
    }

    fn send(&self, _endpoint: &str, body: Vec<u8>) -> Result<()> {
        if self.fail_send {
            return Err(HotspotError::Transport("connection refused".to_string()));
        }
        self.sent.borrow_mut().push(body);
        Ok(())
    }
}
