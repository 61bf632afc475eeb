//! Plan Events
//!
//! Fire-and-forget notifications emitted by the orchestration core for
//! external observability. Publishing never blocks and never fails the
//! caller; a sink that cannot deliver an event simply drops it.

#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Observable event emitted during plan execution and stream aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    /// A plan-level or stream-level failure
    PlanException { plan_id: String, message: String },

    /// Periodic progress of a streaming aggregation
    StreamProgress {
        context_name: String,
        plan_id: String,
        elapsed_ms: u64,
        chunk_count: usize,
        text_length: usize,
        tool_call_count: usize,
        chars_per_second: f64,
    },

    /// Aggregation stopped consuming a stream early
    StreamEarlyTerminated {
        context_name: String,
        plan_id: String,
        chunk_count: usize,
        text_length: usize,
    },

    /// A step loop observed an interruption request
    PlanInterrupted { root_plan_id: String, state: String },

    /// A plan finished, successfully or not
    PlanCompleted { plan_id: String, success: bool },
}

impl PlanEvent {
    /// Plan id this event refers to.
    pub fn plan_id(&self) -> &str {
        match self {
            PlanEvent::PlanException { plan_id, .. }
            | PlanEvent::StreamProgress { plan_id, .. }
            | PlanEvent::StreamEarlyTerminated { plan_id, .. }
            | PlanEvent::PlanCompleted { plan_id, .. } => plan_id,
            PlanEvent::PlanInterrupted { root_plan_id, .. } => root_plan_id,
        }
    }
}

/// Notification sink for plan events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PlanEvent);
}

/// Publisher that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventPublisher;

impl EventPublisher for NoopEventPublisher {
    fn publish(&self, _event: PlanEvent) {}
}

/// Publisher that keeps every event in memory, for inspection in tests.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct CollectingEventPublisher {
    events: Mutex<Vec<PlanEvent>>,
}

#[cfg(any(test, feature = "test-util"))]
impl CollectingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events published so far.
    pub fn events(&self) -> Vec<PlanEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(any(test, feature = "test-util"))]
impl EventPublisher for CollectingEventPublisher {
    fn publish(&self, event: PlanEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
