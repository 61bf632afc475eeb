//! Core Error Types
//!
//! Error types shared by every crate in the Plan Relay workspace. Kept to
//! thiserror + serde_json so the core crate stays lightweight.
//!
//! The application crate wraps these in `AppError` alongside storage and
//! pipeline failures.

use thiserror::Error;

/// Core error type for the Plan Relay workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No tool is registered under the requested name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool ran and failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Malformed input handed to a tool or registry
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a tool-not-found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    /// Create a tool execution error
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
