//! Cooperative interruption check for long-running loops and tools.

use std::sync::Arc;

use tracing::{info, warn};

use plan_relay_core::context::ToolContext;

use super::coordinator::InterruptionCoordinator;

/// Thin wrapper that turns an interruption into a "stop looping" signal.
#[derive(Clone)]
pub struct InterruptionChecker {
    coordinator: Arc<InterruptionCoordinator>,
}

impl InterruptionChecker {
    pub fn new(coordinator: Arc<InterruptionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Returns `false` when the caller should stop.
    pub async fn check_and_continue(&self, root_plan_id: &str) -> bool {
        match self.coordinator.check_and_throw_if_interrupted(root_plan_id).await {
            Ok(()) => true,
            Err(e) if e.is_interrupted() => {
                info!("[Interruption] Halting work for {}: {}", root_plan_id, e);
                false
            }
            Err(e) => {
                warn!("[Interruption] Check failed for {}: {}", root_plan_id, e);
                true
            }
        }
    }

    /// Same as [`check_and_continue`](Self::check_and_continue) for a tool
    /// invocation. Contexts without a root plan id always continue.
    pub async fn check_tool_context(&self, ctx: &ToolContext) -> bool {
        match ctx.root_plan_id() {
            Some(id) => self.check_and_continue(id).await,
            None => true,
        }
    }
}
