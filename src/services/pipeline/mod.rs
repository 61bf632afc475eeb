//! Plan Execution Pipeline
//!
//! Creates a plan, selects an executor by plan type, runs the steps on the
//! level-based pool and funnels the result through finalization.

pub mod context;
pub mod coordinator;
pub mod creator;
pub mod executor;
pub mod factory;
pub mod finalizer;
pub mod pool;

pub use context::ExecutionContext;
pub use coordinator::{
    DirectPlanRequest, PlanExecutionHandle, PlanningCoordinator, UserQueryRequest,
    PLAN_CREATION_FAILED_MESSAGE,
};
pub use creator::{PlanCreator, PlanCreatorRegistry, SingleStepPlanCreator};
pub use executor::{PlanExecutor, SequentialPlanExecutor, StepRunner, PLAN_INTERRUPTED_MESSAGE};
pub use factory::{PlanExecutorFactory, DIRECT_PLAN_TYPE, DYNAMIC_AGENT_PLAN_TYPE};
pub use finalizer::{PlanFinalizer, TASK_INTERRUPTED_MESSAGE};
pub use pool::LevelBasedExecutorPool;
