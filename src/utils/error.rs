//! Error Handling
//!
//! Unified error types for the orchestration layer.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use plan_relay_core::CoreError;
use plan_relay_llm::LlmError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cooperative stop signal observed at a step boundary
    #[error("Task {root_plan_id} was interrupted with state: {state}")]
    Interrupted { root_plan_id: String, state: String },

    /// No plan was produced for a request
    #[error("Plan creation error: {0}")]
    PlanCreation(String),

    /// Finalization of an executed plan failed
    #[error("Post-execution error: {0}")]
    PostExecution(String),

    /// Tool and core errors
    #[error(transparent)]
    Core(#[from] CoreError),

    /// LLM streaming errors
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an interruption signal
    pub fn interrupted(root_plan_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self::Interrupted {
            root_plan_id: root_plan_id.into(),
            state: state.into(),
        }
    }

    /// Create a plan creation error
    pub fn plan_creation(msg: impl Into<String>) -> Self {
        Self::PlanCreation(msg.into())
    }

    /// Create a post-execution error
    pub fn post_execution(msg: impl Into<String>) -> Self {
        Self::PostExecution(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, AppError::Interrupted { .. })
    }
}

/// Convert AppError to a string
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
