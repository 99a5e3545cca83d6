//! Event construction and buffering.

use std::rc::Rc;

use hotspot_core::events::{Batch, EventData, TrackingEvent};
use tracing::trace;

use crate::host::Host;
use crate::transmitter::{Delivery, Transmitter};

/// Sink the detectors write into.
pub trait Record {
    fn record(&mut self, data: EventData);
}

/// Stamps events with session context and buffers them until a flush.
///
/// A full buffer (`max_batch_size` events) triggers an immediate flush.
pub struct EventRecorder {
    host: Rc<dyn Host>,
    session_id: String,
    user_id: String,
    max_batch_size: usize,
    buffer: Vec<TrackingEvent>,
    transmitter: Transmitter,
}

impl EventRecorder {
    pub fn new(
        host: Rc<dyn Host>,
        session_id: String,
        user_id: String,
        max_batch_size: usize,
        transmitter: Transmitter,
    ) -> Self {
        Self {
            host,
            session_id,
            user_id,
            max_batch_size: max_batch_size.max(1),
            buffer: Vec::new(),
            transmitter,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Applies to events recorded from now on.
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Send up to `max_batch_size` of the oldest buffered events.
    ///
    /// Returns `None` when the buffer was empty.
    pub fn flush(&mut self) -> Option<Delivery> {
        if self.buffer.is_empty() {
            return None;
        }

        let take = self.buffer.len().min(self.max_batch_size);
        let events: Vec<TrackingEvent> = self.buffer.drain(..take).collect();
        let device = self.host.device();
        let batch = Batch {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            user_agent: device.user_agent.clone(),
            screen_resolution: device.screen_resolution(),
            language: device.language,
            platform: device.platform,
            timestamp: self.host.now_ms(),
            events,
        };

        let delivery = self.transmitter.deliver(&batch);
        trace!(events = batch.events.len(), ?delivery, "Flushed batch");
        Some(delivery)
    }

    /// Flush until the buffer is empty.
    pub fn drain(&mut self) {
        while self.flush().is_some() {}
    }
}

impl Record for EventRecorder {
    fn record(&mut self, data: EventData) {
        let location = self.host.location();
        self.buffer.push(TrackingEvent {
            timestamp: self.host.now_ms(),
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            url: location.href,
            path: location.pathname,
            viewport: self.host.viewport(),
            data,
        });

        if self.buffer.len() >= self.max_batch_size {
            self.flush();
        }
    }
}

/// Collects payloads without any session context.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct CollectingRecorder {
    pub events: Vec<EventData>,
}

#[cfg(test)]
impl Record for CollectingRecorder {
    fn record(&mut self, data: EventData) {
        self.events.push(data);
    }
}
