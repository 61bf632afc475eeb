//! Pipeline Integration Tests
//!
//! Runs plans through `RelayState` over a SQLite file, with a second
//! coordinator on the same file acting as the UI worker that pauses plans.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use tempfile::TempDir;
use tokio::sync::broadcast;

use plan_relay::services::interruption::InterruptionCoordinator;
use plan_relay::services::pipeline::{
    DirectPlanRequest, ExecutionContext, StepRunner, UserQueryRequest,
    PLAN_CREATION_FAILED_MESSAGE, TASK_INTERRUPTED_MESSAGE,
};
use plan_relay::storage::{Database, SqliteTaskStore};
use plan_relay::{
    AppResult, DesiredTaskState, ExecutionStep, Plan, RelayComponents, RelayState, RuntimeConfig,
};
use plan_relay_core::{ChatChunk, PlanEvent};
use plan_relay_llm::{ChatRequest, ChunkStream, LlmProvider, LlmResult};
use plan_relay_tools::ToolRegistry;

/// Runs steps and pauses the root plan from another worker after a given step.
struct PausingRunner {
    ui: Arc<InterruptionCoordinator>,
    pause_after: Option<usize>,
    ran: Mutex<Vec<String>>,
}

#[async_trait]
impl StepRunner for PausingRunner {
    async fn run_step(&self, ctx: &ExecutionContext, step: &ExecutionStep) -> AppResult<String> {
        self.ran.lock().unwrap().push(step.step_requirement.clone());
        if self.pause_after == Some(step.step_index) {
            self.ui.pause_task(ctx.root_plan_id()).await;
        }
        Ok(format!("{} ok", step.step_requirement))
    }
}

struct SummaryProvider;

#[async_trait]
impl LlmProvider for SummaryProvider {
    fn name(&self) -> &str {
        "summary"
    }

    fn model(&self) -> &str {
        "summary-1"
    }

    async fn stream_chat(&self, _request: ChatRequest) -> LlmResult<ChunkStream> {
        let chunks: Vec<LlmResult<ChatChunk>> = ["All ", "steps ", "done."]
            .into_iter()
            .map(|t| Ok(ChatChunk::text(t)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

struct Fixture {
    _dir: TempDir,
    state: RelayState,
    ui: Arc<InterruptionCoordinator>,
    runner: Arc<PausingRunner>,
}

fn fixture(pause_after: Option<usize>, with_llm: bool) -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.db");

    let ui_db = Database::open(&path).unwrap();
    let ui = Arc::new(InterruptionCoordinator::new(Arc::new(SqliteTaskStore::new(
        &ui_db,
    ))));
    let runner = Arc::new(PausingRunner {
        ui: ui.clone(),
        pause_after,
        ran: Mutex::new(Vec::new()),
    });

    let config = RuntimeConfig {
        database_path: Some(path),
        ..Default::default()
    };
    let mut components = RelayComponents::new(runner.clone(), Arc::new(ToolRegistry::new()));
    if with_llm {
        components = components.with_llm(Arc::new(SummaryProvider));
    }
    let state = RelayState::open(config, components).unwrap();

    Fixture {
        _dir: dir,
        state,
        ui,
        runner,
    }
}

fn three_step_plan() -> Plan {
    Plan::new("dynamic_agent", "Quarterly report")
        .with_user_request("Prepare the quarterly report")
        .with_step(ExecutionStep::new("collect"))
        .with_step(ExecutionStep::new("analyze"))
        .with_step(ExecutionStep::new("write"))
}

fn drain(rx: &mut broadcast::Receiver<PlanEvent>) -> Vec<PlanEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Direct plans
// ============================================================================

#[tokio::test]
async fn test_direct_plan_completes_and_records_result() {
    let f = fixture(None, false);
    let mut rx = f.state.events().subscribe();

    let result = f
        .state
        .planning()
        .execute_by_plan(DirectPlanRequest::new(three_step_plan(), "root", "root"))
        .await;

    assert!(result.success);
    assert_eq!(result.step_results.len(), 3);
    assert_eq!(result.final_result.as_deref(), Some("write ok"));

    // The UI worker sees the registered root task and its result.
    let task = f.ui.get_task("root").await.unwrap();
    assert_eq!(task.desired_state, DesiredTaskState::Start);
    assert_eq!(task.task_result.as_deref(), Some("write ok"));

    assert!(drain(&mut rx).contains(&PlanEvent::PlanCompleted {
        plan_id: "root".into(),
        success: true
    }));
}

#[tokio::test]
async fn test_pause_from_ui_stops_at_next_step() {
    let f = fixture(Some(1), false);
    let mut rx = f.state.events().subscribe();

    let result = f
        .state
        .planning()
        .execute_by_plan(DirectPlanRequest::new(three_step_plan(), "root", "root"))
        .await;

    assert!(!result.success);
    assert_eq!(*f.runner.ran.lock().unwrap(), vec!["collect", "analyze"]);
    assert_eq!(result.interrupted_state, Some(DesiredTaskState::Pause));
    assert_eq!(result.last_step_index, Some(1));
    assert_eq!(result.error_message.as_deref(), Some(TASK_INTERRUPTED_MESSAGE));
    assert!(result
        .final_result
        .unwrap()
        .contains("Prepare the quarterly report"));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        PlanEvent::PlanInterrupted { state, .. } if state == "PAUSE"
    )));
    assert!(f.state.interruption().should_interrupt("root").await);
}

#[tokio::test]
async fn test_sub_plan_does_not_touch_root_result() {
    let f = fixture(None, false);
    f.ui.create_or_update_task("root", DesiredTaskState::Start)
        .await
        .unwrap();

    let mut request = DirectPlanRequest::new(three_step_plan(), "root", "child");
    request.parent_plan_id = Some("root".into());
    request.plan_depth = 1;
    request.tool_call_id = Some("toolcall-7".into());
    let result = f.state.planning().execute_by_plan(request).await;

    assert!(result.success);
    assert!(f.ui.get_task("root").await.unwrap().task_result.is_none());
    assert!(!f.ui.task_exists("child").await);
}

// ============================================================================
// User queries
// ============================================================================

#[tokio::test]
async fn test_user_query_is_summarized() {
    let f = fixture(None, true);
    let result = f
        .state
        .planning()
        .execute_by_user_query(UserQueryRequest {
            user_query: "check the weather".into(),
            root_plan_id: "root-q".into(),
            current_plan_id: "root-q".into(),
            ..Default::default()
        })
        .await;

    assert!(result.success);
    assert_eq!(*f.runner.ran.lock().unwrap(), vec!["check the weather"]);
    assert_eq!(result.final_result.as_deref(), Some("All steps done."));
    assert_eq!(
        f.ui.get_task("root-q").await.unwrap().task_result.as_deref(),
        Some("All steps done.")
    );
}

#[tokio::test]
async fn test_blank_user_query_fails_plan_creation() {
    let f = fixture(None, false);
    let result = f
        .state
        .planning()
        .execute_by_user_query(UserQueryRequest {
            user_query: "   ".into(),
            root_plan_id: "root".into(),
            current_plan_id: "root".into(),
            plan_type: Some("SIMPLE".into()),
            ..Default::default()
        })
        .await;

    assert!(!result.success);
    assert_eq!(result.error_message.as_deref(), Some(PLAN_CREATION_FAILED_MESSAGE));
    assert!(f.runner.ran.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_plans_are_independent() {
    let f = fixture(None, false);
    let handles: Vec<_> = (0..5)
        .map(|i| {
            let id = format!("root-{}", i);
            f.state
                .planning()
                .execute_by_plan(DirectPlanRequest::new(three_step_plan(), id.clone(), id))
        })
        .collect();

    for handle in handles {
        assert!(handle.await.success);
    }
    assert_eq!(f.state.interruption().count_running().await, 5);
}
