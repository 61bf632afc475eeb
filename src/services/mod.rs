//! Services Module
//!
//! Orchestration services built on the storage layer:
//! - `interruption` - desired-state coordination for root plans
//! - `pipeline` - plan creation, execution and finalization
//! - `events` - broadcast fan-out of plan events

pub mod events;
pub mod interruption;
pub mod pipeline;

pub use events::BroadcastEventPublisher;
pub use interruption::{InterruptionChecker, InterruptionCoordinator, RetentionSweeper};
pub use pipeline::{
    DirectPlanRequest, ExecutionContext, LevelBasedExecutorPool, PlanCreator, PlanCreatorRegistry,
    PlanExecutionHandle, PlanExecutor, PlanExecutorFactory, PlanFinalizer, PlanningCoordinator,
    StepRunner, UserQueryRequest,
};
