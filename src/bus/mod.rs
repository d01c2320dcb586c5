//! In-process event bus
//!
//! Publish/subscribe with named channels. Delivery is synchronous, on the
//! calling thread, in registration order. A handler that fails is logged and
//! does not stop the remaining handlers or surface to the publisher.
//!
//! All domain engines publish through one coarse channel (`SYSTEM_CHANNEL`)
//! carrying a `{type, payload}` envelope; each subscriber dispatches on
//! `Event::event_type` internally.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single coarse channel all engines publish on
pub const SYSTEM_CHANNEL: &str = "system_event";

/// A named, payload-bearing event
///
/// Events are immutable and ephemeral. The bus does not persist them;
/// persistence, if any, is a subscriber's concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Dot-namespaced type tag, e.g. `"chaos.file.created"`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Free-form payload
    pub payload: Value,
}

impl Event {
    /// Create a new event
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Type alias for stored handlers
pub type Handler = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;

/// In-process publish/subscribe bus
///
/// Handlers for one publish run in registration order. Concurrent publishes
/// from different threads are serialized by a dispatch lock so handler
/// execution never interleaves. Handlers must not publish from inside a
/// handler; the dispatch lock is not reentrant.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<Handler>>>,
    dispatch: Mutex<()>,
}

impl EventBus {
    /// Create a new empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a channel
    ///
    /// Multiple handlers per channel are allowed and invoked in
    /// registration order.
    pub fn subscribe<F>(&self, channel: impl Into<String>, handler: F)
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        let channel = channel.into();
        tracing::debug!("[EventBus] Subscribing handler to '{}'", channel);
        self.handlers
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Publish an event on a channel
    ///
    /// Invokes every subscribed handler synchronously on the calling thread.
    /// Handler failures are logged and never propagate to the publisher.
    pub fn publish(&self, channel: &str, event: &Event) {
        let handlers: Vec<Handler> = match self.handlers.lock().unwrap().get(channel) {
            Some(list) => list.clone(),
            None => return,
        };

        let _guard = self.dispatch.lock().unwrap();
        for handler in &handlers {
            if let Err(e) = handler(event) {
                tracing::warn!(
                    "[EventBus] Handler error for '{}' ({}): {}",
                    channel,
                    event.event_type,
                    e
                );
            }
        }
    }

    /// Publish a `{type, payload}` envelope on the system channel
    pub fn emit(&self, event_type: impl Into<String>, payload: Value) {
        self.publish(SYSTEM_CHANNEL, &Event::new(event_type, payload));
    }

    /// Number of handlers subscribed to a channel
    pub fn handler_count(&self, channel: &str) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .get(channel)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}
