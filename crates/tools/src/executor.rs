//! Tool Result
//!
//! Outcome of a single tool invocation. A failed tool is still a value, not
//! an error: batch execution records it per entry and keeps going.

use serde::{Deserialize, Serialize};

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// The output on success, the error message otherwise.
    pub fn text(&self) -> &str {
        if self.success {
            self.output.as_deref().unwrap_or_default()
        } else {
            self.error.as_deref().unwrap_or("Unknown error")
        }
    }

    /// Convert to string for LLM consumption
    pub fn to_content(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_default()
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }

    /// Unescape quotes that tools double-encode in their output.
    pub fn normalized(mut self) -> Self {
        if let Some(output) = self.output.as_mut() {
            if output.contains("\\\"") {
                *output = output.replace("\\\"", "\"");
            }
        }
        self
    }
}
