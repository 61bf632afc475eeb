//! Parallel Execution Tool
//!
//! Exposes a [`ParallelExecutor`] to the model as a single tool driven by an
//! `action` field: `registerBatch`, `start`, `getPending` and `clearPending`.
//! Per-entry failures are reported inside the result; only a malformed
//! request fails the call as a whole.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::warn;

use plan_relay_core::context::ToolContext;
use plan_relay_core::error::{CoreError, CoreResult};

use crate::executor::ToolResult;
use crate::parallel::{FunctionRequest, ParallelExecutor};
use crate::trait_def::{Tool, ToolInput};

pub const PARALLEL_EXECUTION_TOOL_NAME: &str = "parallel_execution_tool";

pub struct ParallelExecutionTool {
    executor: Arc<ParallelExecutor>,
}

impl ParallelExecutionTool {
    pub fn new(executor: Arc<ParallelExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<ParallelExecutor> {
        &self.executor
    }

    fn register_batch(&self, functions: Option<&Value>) -> CoreResult<ToolResult> {
        let requests = parse_functions(functions)?;
        let registered = self.executor.register_batch(requests);
        let functions: Vec<Value> = registered
            .iter()
            .map(|f| {
                json!({
                    "id": f.id,
                    "toolName": f.tool_name,
                    "input": f.input,
                    "status": "REGISTERED",
                })
            })
            .collect();
        let body = json!({
            "message": format!("Successfully registered {} functions", registered.len()),
            "functions": functions,
        });
        Ok(ToolResult::ok(body.to_string()))
    }

    async fn start(&self, ctx: &ToolContext) -> CoreResult<ToolResult> {
        if self.executor.is_empty() {
            return Ok(ToolResult::ok(
                json!({ "message": "No functions registered", "results": [] }).to_string(),
            ));
        }

        let report = self.executor.start(ctx).await;
        let message = if report.dispatched == 0 {
            "No pending functions to execute".to_string()
        } else {
            format!("Successfully executed {} functions", report.dispatched)
        };
        let body = json!({
            "message": message,
            "results": serde_json::to_value(&report.records)?,
        });
        Ok(ToolResult::ok(body.to_string()))
    }

    fn get_pending(&self) -> CoreResult<ToolResult> {
        let pending = self.executor.pending();
        let body = json!({
            "count": pending.len(),
            "pending": serde_json::to_value(&pending)?,
        });
        Ok(ToolResult::ok(body.to_string()))
    }

    fn clear_pending(&self) -> CoreResult<ToolResult> {
        let count = self.executor.clear_pending();
        let body = json!({
            "message": format!("Cleared {} pending functions", count),
            "count": count,
        });
        Ok(ToolResult::ok(body.to_string()))
    }
}

/// Parse the `functions` field: an array, or a JSON string encoding one.
///
/// Entries without a tool name are skipped; a missing or null input
/// becomes an empty map.
fn parse_functions(functions: Option<&Value>) -> CoreResult<Vec<FunctionRequest>> {
    let parsed;
    let items = match functions {
        Some(Value::Array(items)) => items,
        Some(Value::String(raw)) => {
            parsed = serde_json::from_str::<Value>(raw)
                .map_err(|e| CoreError::invalid_input(format!("functions is not valid JSON: {}", e)))?;
            match &parsed {
                Value::Array(items) => items,
                _ => return Err(CoreError::invalid_input("functions must be an array")),
            }
        }
        Some(_) => return Err(CoreError::invalid_input("functions must be an array")),
        None => return Err(CoreError::invalid_input("functions is required for registerBatch")),
    };

    let mut requests = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(fields) = item else {
            return Err(CoreError::invalid_input("each function must be an object"));
        };
        let tool_name = fields
            .get("toolName")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty());
        let Some(tool_name) = tool_name else {
            warn!("[ParallelExecution] Skipping function without toolName: {}", item);
            continue;
        };
        let input = match fields.get("input") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(CoreError::invalid_input(format!(
                    "input for {} must be an object",
                    tool_name
                )))
            }
        };
        requests.push(FunctionRequest::new(tool_name, input));
    }
    Ok(requests)
}

#[async_trait]
impl Tool for ParallelExecutionTool {
    fn name(&self) -> &str {
        PARALLEL_EXECUTION_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Register several tool calls and run them concurrently. Use registerBatch to queue calls, \
         start to execute everything pending, getPending to inspect the queue and clearPending to drop it."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["registerBatch", "start", "getPending", "clearPending"]
                },
                "functions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "toolName": { "type": "string" },
                            "input": { "type": "object" }
                        },
                        "required": ["toolName"]
                    }
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: ToolInput) -> CoreResult<ToolResult> {
        let action = input
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_input("action is required"))?;

        match action {
            "registerBatch" => self.register_batch(input.get("functions")),
            "start" => self.start(ctx).await,
            "getPending" => self.get_pending(),
            "clearPending" => self.clear_pending(),
            other => Err(CoreError::invalid_input(format!("Unknown action: {}", other))),
        }
    }
}
