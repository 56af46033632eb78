//! Event bus - broadcast channel shared by every component

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::IntersectionEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Broadcasts [`IntersectionEvent`]s to every subscriber
///
/// Emission is fire-and-forget. Slow subscribers lag and lose the oldest
/// events; emitters never block.
pub struct EventBus {
    tx: broadcast::Sender<IntersectionEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all current subscribers
    pub fn emit(&self, event: IntersectionEvent) {
        debug!(event_type = event.event_type(), signal = ?event.signal(), "EventBus::emit");
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<IntersectionEvent> {
        let rx = self.tx.subscribe();
        debug!(subscribers = self.subscriber_count(), "EventBus::subscribe: new subscriber");
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus(capacity: usize) -> Arc<EventBus> {
    Arc::new(EventBus::new(capacity))
}
