//! Interruption Coordination
//!
//! Desired-state store for root plans plus the cooperative checks workers
//! run between steps.

pub mod checker;
pub mod coordinator;
pub mod retention;

pub use checker::InterruptionChecker;
pub use coordinator::InterruptionCoordinator;
pub use retention::RetentionSweeper;
