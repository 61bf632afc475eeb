//! Plan Relay Tools
//!
//! Tool abstraction and the parallel execution subsystem:
//! - `ToolResult` - execution result type
//! - `Tool` trait - unified tool interface
//! - `ToolRegistry` - name-based tool lookup
//! - `FunctionTool` - closure-based tool creation
//! - `ParallelExecutor` - register/start/getPending/clearPending/cleanup over
//!   a per-step function registry
//! - `ParallelExecutionTool` - the executor exposed as an action-driven tool
//! - `execute_tool_calls_in_parallel` - one-shot fan-out of model tool calls

pub mod executor;
pub mod parallel;
pub mod parallel_tool;
pub mod trait_def;

// Re-export core types
pub use executor::ToolResult;
pub use parallel::{
    execute_tool_calls_in_parallel, parse_tool_arguments, FunctionOutcome, FunctionRecord,
    FunctionRegistry, FunctionRequest, FunctionStatus, ParallelExecutor, RegisteredFunction,
    StartReport, ToolExecutionOutcome,
};
pub use parallel_tool::{ParallelExecutionTool, PARALLEL_EXECUTION_TOOL_NAME};
pub use trait_def::{FunctionTool, Tool, ToolDefinition, ToolInput, ToolRegistry};
