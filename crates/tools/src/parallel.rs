//! Parallel Execution
//!
//! Batches tool invocations and fans them out concurrently.
//!
//! Registration and execution are decoupled: a planning step may register
//! calls over several reasoning turns and trigger a single fan-out with
//! [`ParallelExecutor::start`]. An entry is pending until its `result` is
//! set, which happens exactly once (completed or cleared). Each entry's
//! outcome is captured independently, so one failing or missing tool never
//! fails the batch.
//!
//! Spawned tasks write their own result into the shared registry, so a
//! `start` future that is dropped mid-join still resolves its entries.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use plan_relay_core::context::ToolContext;
use plan_relay_core::ids::generate_parallel_execution_id;
use plan_relay_core::streaming::ToolCallRequest;

use crate::executor::ToolResult;
use crate::trait_def::{Tool, ToolInput, ToolRegistry};

// ============================================================================
// Registry entries
// ============================================================================

/// Terminal outcome of a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionOutcome {
    Completed(ToolResult),
    /// Removed from future fan-outs by `clear_pending`
    Cleared,
}

/// One registered call.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    pub id: String,
    pub tool_name: String,
    pub input: ToolInput,
    pub result: Option<FunctionOutcome>,
    /// Handed to a running task, result not yet recorded
    dispatched: bool,
}

impl FunctionRegistry {
    fn new(tool_name: String, input: ToolInput) -> Self {
        Self {
            id: generate_parallel_execution_id(),
            tool_name,
            input,
            result: None,
            dispatched: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

/// A call to register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRequest {
    pub tool_name: String,
    #[serde(default)]
    pub input: ToolInput,
}

impl FunctionRequest {
    pub fn new(tool_name: impl Into<String>, input: ToolInput) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
        }
    }
}

/// Registered (or still pending) call, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredFunction {
    pub id: String,
    pub tool_name: String,
    pub input: ToolInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionStatus {
    Completed,
    Cleared,
}

/// Output record for an entry that is no longer pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    pub id: String,
    pub tool_name: String,
    pub status: FunctionStatus,
    pub success: bool,
    pub output: String,
}

/// Summary of one `start` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
    /// Entries resolved by this call, spawned or synthesized
    pub dispatched: usize,
    /// Tasks spawned by this call
    pub spawned: usize,
    /// Every non-pending entry, in registration order
    pub records: Vec<FunctionRecord>,
}

// ============================================================================
// ParallelExecutor
// ============================================================================

type SharedEntries = Arc<Mutex<Vec<FunctionRegistry>>>;

fn lock_entries(entries: &Mutex<Vec<FunctionRegistry>>) -> MutexGuard<'_, Vec<FunctionRegistry>> {
    entries.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the function registry of one plan step.
pub struct ParallelExecutor {
    tools: Arc<ToolRegistry>,
    entries: SharedEntries,
}

impl ParallelExecutor {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FunctionRegistry>> {
        lock_entries(&self.entries)
    }

    /// Append one entry per request. Duplicates get independent ids.
    pub fn register_batch(&self, requests: Vec<FunctionRequest>) -> Vec<RegisteredFunction> {
        let mut entries = self.lock();
        let registered: Vec<RegisteredFunction> = requests
            .into_iter()
            .map(|request| {
                let entry = FunctionRegistry::new(request.tool_name, request.input);
                let echo = RegisteredFunction {
                    id: entry.id.clone(),
                    tool_name: entry.tool_name.clone(),
                    input: entry.input.clone(),
                };
                entries.push(entry);
                echo
            })
            .collect();
        info!(
            "[ParallelExecution] Registered {} functions ({} total)",
            registered.len(),
            entries.len()
        );
        registered
    }

    /// Run every pending entry concurrently and wait for all of them.
    ///
    /// Entries whose tool is missing resolve immediately to a
    /// "Tool not found" result without spawning a task. Entries already
    /// resolved by an earlier call are reported but never re-run, and entries
    /// still running from an earlier, abandoned call are not spawned again.
    pub async fn start(&self, parent: &ToolContext) -> StartReport {
        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        let mut synthesized = 0;

        {
            let mut entries = self.lock();
            for entry in entries.iter_mut().filter(|e| e.is_pending() && !e.dispatched) {
                match self.tools.get(&entry.tool_name) {
                    Some(tool) => {
                        entry.dispatched = true;
                        let ctx = parent.child();
                        let input = entry.input.clone();
                        let id = entry.id.clone();
                        let shared = self.entries.clone();
                        handles.push(tokio::spawn(async move {
                            let result = match AssertUnwindSafe(invoke_tool(tool, ctx, input))
                                .catch_unwind()
                                .await
                            {
                                Ok(result) => result,
                                Err(panic) => ToolResult::err(format!(
                                    "Error: tool panicked: {}",
                                    panic_message(panic.as_ref())
                                )),
                            };
                            complete(&shared, &id, result);
                        }));
                    }
                    None => {
                        warn!("[ParallelExecution] Tool not found: {}", entry.tool_name);
                        entry.result = Some(FunctionOutcome::Completed(ToolResult::err(format!(
                            "Tool not found: {}",
                            entry.tool_name
                        ))));
                        synthesized += 1;
                    }
                }
            }
        }

        let spawned = handles.len();
        if spawned > 0 {
            debug!("[ParallelExecution] Spawned {} tool tasks", spawned);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("[ParallelExecution] Tool task did not finish: {}", e);
            }
        }

        let records = self.records();
        info!(
            "[ParallelExecution] Fan-out finished: {} spawned, {} synthesized, {} resolved in total",
            spawned,
            synthesized,
            records.len()
        );

        StartReport {
            dispatched: spawned + synthesized,
            spawned,
            records,
        }
    }

    /// Entries whose result is still unset.
    pub fn pending(&self) -> Vec<RegisteredFunction> {
        self.lock()
            .iter()
            .filter(|e| e.is_pending())
            .map(|e| RegisteredFunction {
                id: e.id.clone(),
                tool_name: e.tool_name.clone(),
                input: e.input.clone(),
            })
            .collect()
    }

    /// Mark every pending entry as cleared. Returns how many were cleared.
    pub fn clear_pending(&self) -> usize {
        let mut entries = self.lock();
        let mut cleared = 0;
        for entry in entries.iter_mut().filter(|e| e.is_pending()) {
            entry.result = Some(FunctionOutcome::Cleared);
            cleared += 1;
        }
        info!("[ParallelExecution] Cleared {} pending functions", cleared);
        cleared
    }

    /// Drop every entry.
    pub fn cleanup(&self) {
        let mut entries = self.lock();
        debug!("[ParallelExecution] Cleaning up {} entries", entries.len());
        entries.clear();
    }

    /// Records for every resolved entry, in registration order.
    pub fn records(&self) -> Vec<FunctionRecord> {
        self.lock()
            .iter()
            .filter_map(|e| {
                let (status, success, output) = match e.result.as_ref()? {
                    FunctionOutcome::Completed(r) => {
                        (FunctionStatus::Completed, r.success, r.text().to_string())
                    }
                    FunctionOutcome::Cleared => (FunctionStatus::Cleared, false, "Cleared".to_string()),
                };
                Some(FunctionRecord {
                    id: e.id.clone(),
                    tool_name: e.tool_name.clone(),
                    status,
                    success,
                    output,
                })
            })
            .collect()
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<FunctionRegistry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Record a spawned task's result. Entries cleared or dropped meanwhile keep
/// their state.
fn complete(entries: &Mutex<Vec<FunctionRegistry>>, id: &str, result: ToolResult) {
    let mut entries = lock_entries(entries);
    if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
        entry.dispatched = false;
        if entry.result.is_none() {
            entry.result = Some(FunctionOutcome::Completed(result));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn invoke_tool(tool: Arc<dyn Tool>, ctx: ToolContext, input: ToolInput) -> ToolResult {
    match tool.execute(&ctx, input).await {
        Ok(result) => result.normalized(),
        Err(e) => {
            warn!("[ParallelExecution] {} failed: {}", tool.name(), e);
            ToolResult::err(format!("Error: {}", e))
        }
    }
}

// ============================================================================
// Direct execution of model tool calls
// ============================================================================

/// Outcome of one model-requested tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionOutcome {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: ToolResult,
}

/// Parse a model's JSON argument string into a tool input map.
///
/// Non-object JSON is wrapped as `{"value": v}`; blank or unparsable input
/// yields an empty map.
pub fn parse_tool_arguments(raw: &str) -> ToolInput {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
        Err(e) => {
            warn!("[ParallelExecution] Failed to parse tool arguments: {}", e);
            Map::new()
        }
    }
}

/// Execute model-requested tool calls concurrently, without a registry.
///
/// Outcomes are returned in the order of `calls`.
pub async fn execute_tool_calls_in_parallel(
    calls: &[ToolCallRequest],
    tools: &ToolRegistry,
    parent: &ToolContext,
) -> Vec<ToolExecutionOutcome> {
    let handles: Vec<(String, String, Option<JoinHandle<ToolResult>>)> = calls
        .iter()
        .map(|call| {
            let handle = tools.get(&call.name).map(|tool| {
                let ctx = parent.child();
                tokio::spawn(invoke_tool(tool, ctx, parse_tool_arguments(&call.arguments)))
            });
            (call.id.clone(), call.name.clone(), handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (tool_call_id, tool_name, handle) in handles {
        let result = match handle {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => ToolResult::err(format!("Error: {}", e)),
            },
            None => {
                warn!("[ParallelExecution] Tool not found: {}", tool_name);
                ToolResult::err(format!("Tool not found: {}", tool_name))
            }
        };
        outcomes.push(ToolExecutionOutcome {
            tool_call_id,
            tool_name,
            result,
        });
    }
    outcomes
}
