//! Data Models
//!
//! Root task rows, plans and execution results, and runtime settings.

pub mod plan;
pub mod root_task;
pub mod settings;

pub use plan::*;
pub use root_task::*;
pub use settings::*;
