//! LLM Trace Recorder
//!
//! Per-request trace lines for chat requests, aggregated responses and
//! upstream failures, logged under the `llm_trace` target. Each recorder
//! carries its own request id so concurrent aggregations stay separable.

use serde::Serialize;
use uuid::Uuid;

use crate::types::LlmError;

/// Log target for trace lines.
pub const LLM_TRACE_TARGET: &str = "llm_trace";

#[derive(Debug, Clone)]
pub struct LlmTraceRecorder {
    request_id: String,
}

impl LlmTraceRecorder {
    /// Start tracing a new request.
    pub fn begin() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn record_request<T: Serialize>(&self, request: &T) {
        match serde_json::to_string(request) {
            Ok(json) => tracing::info!(target: "llm_trace", "Request[{}]: {}", self.request_id, json),
            Err(e) => tracing::error!("[LlmTrace] Failed to serialize chat request: {}", e),
        }
    }

    pub fn record_response<T: Serialize>(&self, response: &T) {
        match serde_json::to_string(response) {
            Ok(json) => tracing::info!(target: "llm_trace", "Response[{}]: {}", self.request_id, json),
            Err(e) => tracing::error!("[LlmTrace] Failed to serialize chat response: {}", e),
        }
    }

    /// Record an upstream failure, including the HTTP status when known.
    pub fn record_error(&self, error: &LlmError) {
        tracing::error!(target: "llm_trace", "{}", self.format_error(error));
    }

    fn format_error(&self, error: &LlmError) -> String {
        match error.status() {
            Some(status) => format!(
                "Error[{}]: Status={}, Body={}",
                self.request_id, status, error
            ),
            None => format!("Error[{}]: {}", self.request_id, error),
        }
    }
}
