//! Tool and Streaming Integration Tests
//!
//! Model output is aggregated, the requested tool calls are fanned out, and
//! interruption-aware tools stop doing work once their root plan is paused.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use plan_relay::services::interruption::{InterruptionChecker, InterruptionCoordinator};
use plan_relay::storage::InMemoryTaskStore;
use plan_relay::DesiredTaskState;
use plan_relay_core::{ChatChunk, CollectingEventPublisher, PlanEvent, ToolCallRequest, ToolContext};
use plan_relay_llm::{AggregationOptions, LlmResult, StreamingAggregator};
use plan_relay_tools::{
    execute_tool_calls_in_parallel, FunctionTool, ParallelExecutionTool, ParallelExecutor, Tool,
    ToolInput, ToolRegistry, ToolResult,
};

fn registry(checker: Option<InterruptionChecker>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FunctionTool::new("add", "adds a and b", |_ctx, input| async move {
        let a = input.get("a").and_then(Value::as_i64).unwrap_or(0);
        let b = input.get("b").and_then(Value::as_i64).unwrap_or(0);
        Ok(ToolResult::ok((a + b).to_string()))
    })));
    if let Some(checker) = checker {
        registry.register(Arc::new(FunctionTool::new(
            "guarded",
            "does work unless the root plan is halted",
            move |ctx, _input| {
                let checker = checker.clone();
                async move {
                    if !checker.check_tool_context(&ctx).await {
                        return Ok(ToolResult::err("halted"));
                    }
                    Ok(ToolResult::ok("worked"))
                }
            },
        )));
    }
    Arc::new(registry)
}

fn call(value: Value) -> ToolInput {
    value.as_object().cloned().unwrap_or_default()
}

fn body(result: &ToolResult) -> Value {
    serde_json::from_str(result.output.as_deref().unwrap()).unwrap()
}

// ============================================================================
// Streamed tool calls
// ============================================================================

#[tokio::test]
async fn test_late_tool_call_survives_early_termination_and_runs() {
    let mut chunks: Vec<LlmResult<ChatChunk>> =
        (0..10).map(|i| Ok(ChatChunk::text(format!("thought {} ", i)))).collect();
    chunks.push(Ok(ChatChunk::tool_call(ToolCallRequest::new(
        "call-1",
        "add",
        r#"{"a": 2, "b": 40}"#,
    ))));
    chunks.push(Ok(ChatChunk::text("done")));

    let result = StreamingAggregator::default()
        .aggregate(stream::iter(chunks), &AggregationOptions::new("step 1", "plan-1"))
        .await
        .unwrap();
    assert!(!result.early_terminated());
    assert_eq!(result.chunk_count(), 12);

    let outcomes = execute_tool_calls_in_parallel(
        result.effective_tool_calls(),
        &registry(None),
        &ToolContext::root().with_plan_ids("plan-1", "plan-1"),
    )
    .await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].tool_call_id, "call-1");
    assert_eq!(outcomes[0].result.output.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_unknown_tool_in_model_output_is_isolated() {
    let calls = vec![
        ToolCallRequest::new("c1", "add", r#"{"a": 1, "b": 1}"#),
        ToolCallRequest::new("c2", "teleport", "{}"),
        ToolCallRequest::new("c3", "add", "not json"),
    ];
    let outcomes = execute_tool_calls_in_parallel(&calls, &registry(None), &ToolContext::root()).await;

    assert_eq!(outcomes[0].result.output.as_deref(), Some("2"));
    assert!(!outcomes[1].result.success);
    assert_eq!(outcomes[1].result.error.as_deref(), Some("Tool not found: teleport"));
    assert_eq!(outcomes[2].result.output.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_early_termination_drops_live_subscription() {
    let publisher = Arc::new(CollectingEventPublisher::new());
    let aggregator = StreamingAggregator::new(publisher.clone());
    let (tx, rx) = mpsc::channel::<LlmResult<ChatChunk>>(4);

    let producer = tokio::spawn(async move {
        let mut sent = 0;
        for i in 0..100 {
            if tx.send(Ok(ChatChunk::text(format!("word{} ", i)))).await.is_err() {
                break;
            }
            sent += 1;
        }
        sent
    });

    let result = aggregator
        .aggregate(ReceiverStream::new(rx), &AggregationOptions::new("chat", "plan-9"))
        .await
        .unwrap();
    assert!(result.early_terminated());
    assert_eq!(result.chunk_count(), 10);
    assert!(result.effective_tool_calls().is_empty());

    let sent = tokio::time::timeout(Duration::from_secs(5), producer)
        .await
        .unwrap()
        .unwrap();
    assert!(sent < 100);
    assert!(publisher
        .events()
        .iter()
        .any(|e| matches!(e, PlanEvent::StreamEarlyTerminated { chunk_count: 10, .. })));
}

// ============================================================================
// Batched fan-out with interruption-aware tools
// ============================================================================

#[tokio::test]
async fn test_batch_fan_out_honors_paused_root() {
    let coordinator = Arc::new(InterruptionCoordinator::new(Arc::new(
        InMemoryTaskStore::new(),
    )));
    coordinator
        .create_or_update_task("root", DesiredTaskState::Start)
        .await
        .unwrap();
    let checker = InterruptionChecker::new(coordinator.clone());
    let tool = ParallelExecutionTool::new(Arc::new(ParallelExecutor::new(registry(Some(
        checker,
    )))));
    let ctx = ToolContext::root()
        .with_plan_ids("root", "root")
        .with_tool_call_id("toolcall-parent");

    let registered = tool
        .execute(
            &ctx,
            call(json!({
                "action": "registerBatch",
                "functions": [
                    {"toolName": "guarded"},
                    {"toolName": "add", "input": {"a": 3, "b": 4}},
                    {"toolName": "missing_tool"}
                ]
            })),
        )
        .await
        .unwrap();
    assert_eq!(
        body(&registered)["message"],
        "Successfully registered 3 functions"
    );

    let started = tool.execute(&ctx, call(json!({"action": "start"}))).await.unwrap();
    let started = body(&started);
    assert_eq!(started["message"], "Successfully executed 3 functions");
    let outputs: Vec<String> = started["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["output"].as_str().unwrap_or_default().to_string())
        .collect();
    assert!(outputs.contains(&"worked".to_string()));
    assert!(outputs.contains(&"7".to_string()));
    assert!(outputs.contains(&"Tool not found: missing_tool".to_string()));

    coordinator.pause_task("root").await;
    tool.execute(
        &ctx,
        call(json!({"action": "registerBatch", "functions": [{"toolName": "guarded"}]})),
    )
    .await
    .unwrap();
    let again = body(&tool.execute(&ctx, call(json!({"action": "start"}))).await.unwrap());
    assert_eq!(again["message"], "Successfully executed 1 functions");
    let results = again["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert!(results
        .iter()
        .any(|r| r["output"].as_str() == Some("halted")));
}

#[tokio::test]
async fn test_clear_pending_then_start_runs_nothing() {
    let executor = Arc::new(ParallelExecutor::new(registry(None)));
    let tool = ParallelExecutionTool::new(executor.clone());
    let ctx = ToolContext::root();

    tool.execute(
        &ctx,
        call(json!({"action": "registerBatch", "functions": json!([{"toolName": "add"}]).to_string()})),
    )
    .await
    .unwrap();
    let cleared = body(&tool.execute(&ctx, call(json!({"action": "clearPending"}))).await.unwrap());
    assert_eq!(cleared["count"], 1);

    let started = body(&tool.execute(&ctx, call(json!({"action": "start"}))).await.unwrap());
    assert_eq!(started["message"], "No pending functions to execute");
    assert!(executor.pending().is_empty());
}
