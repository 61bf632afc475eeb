//! Event broadcast
//!
//! Fan-out of [`PlanEvent`]s to any number of in-process subscribers over a
//! tokio broadcast channel. Publishing with no subscribers is a no-op.

use tokio::sync::broadcast;
use tracing::trace;

use plan_relay_core::events::{EventPublisher, PlanEvent};

/// Default channel capacity; slow subscribers lag past this many events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<PlanEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlanEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: PlanEvent) {
        if self.sender.send(event).is_err() {
            trace!("[Events] No subscribers, event dropped");
        }
    }
}
