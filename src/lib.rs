//! Plan Relay
//!
//! Orchestration core for multi-step, multi-worker, cancellable plan
//! execution. It includes:
//! - Desired-state interruption coordination over a shared task store
//! - The plan pipeline (creation, executor selection, finalization)
//! - Storage layer (SQLite, in-memory, JSON config)
//! - Data models and utilities
//!
//! Streaming aggregation lives in `plan-relay-llm` and parallel tool
//! execution in `plan-relay-tools`.

pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::plan::{ExecutionStep, Plan, PlanExecutionResult, StepResult, StepStatus};
pub use models::root_task::{DesiredTaskState, RootTask};
pub use models::settings::{RuntimeConfig, RuntimeConfigUpdate};
pub use state::{RelayComponents, RelayState};
pub use utils::error::{AppError, AppResult};
