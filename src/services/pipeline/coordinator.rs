//! Planning Coordinator
//!
//! Entry points of the plan execution pipeline. Each call spawns the
//! create → execute → finalize chain on the executor pool level matching its
//! nesting depth and returns a [`PlanExecutionHandle`] immediately. The
//! handle always resolves to a [`PlanExecutionResult`]; errors, including a
//! panic of the spawned work, become failed results.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use plan_relay_core::ids::generate_conversation_id;

use crate::models::plan::{Plan, PlanExecutionResult};
use crate::models::root_task::DesiredTaskState;
use crate::services::interruption::InterruptionCoordinator;
use crate::utils::error::AppResult;

use super::context::ExecutionContext;
use super::creator::PlanCreatorRegistry;
use super::factory::PlanExecutorFactory;
use super::finalizer::PlanFinalizer;
use super::pool::LevelBasedExecutorPool;

pub const PLAN_CREATION_FAILED_MESSAGE: &str = "Plan creation failed, cannot create execution plan";

/// Plan from a free-form user query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQueryRequest {
    pub user_query: String,
    pub root_plan_id: String,
    #[serde(default)]
    pub parent_plan_id: Option<String>,
    pub current_plan_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    /// Defaults to `simple`
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub plan_depth: u32,
}

/// Execute a plan supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectPlanRequest {
    pub plan: Plan,
    pub root_plan_id: String,
    #[serde(default)]
    pub parent_plan_id: Option<String>,
    pub current_plan_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub is_root_ui_request: bool,
    #[serde(default)]
    pub upload_key: Option<String>,
    #[serde(default)]
    pub plan_depth: u32,
}

impl DirectPlanRequest {
    pub fn new(
        plan: Plan,
        root_plan_id: impl Into<String>,
        current_plan_id: impl Into<String>,
    ) -> Self {
        Self {
            plan,
            root_plan_id: root_plan_id.into(),
            parent_plan_id: None,
            current_plan_id: current_plan_id.into(),
            conversation_id: None,
            tool_call_id: None,
            is_root_ui_request: false,
            upload_key: None,
            plan_depth: 0,
        }
    }
}

/// Pending pipeline run.
pub struct PlanExecutionHandle {
    inner: JoinHandle<PlanExecutionResult>,
}

impl PlanExecutionHandle {
    fn new(inner: JoinHandle<PlanExecutionResult>) -> Self {
        Self { inner }
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Future for PlanExecutionHandle {
    type Output = PlanExecutionResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => {
                error!("[PlanningCoordinator] Plan execution task failed: {}", e);
                Poll::Ready(PlanExecutionResult::failed(format!(
                    "Plan execution failed: {}",
                    e
                )))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Clone)]
pub struct PlanningCoordinator {
    creators: Arc<PlanCreatorRegistry>,
    executors: Arc<PlanExecutorFactory>,
    finalizer: Arc<PlanFinalizer>,
    pool: Arc<LevelBasedExecutorPool>,
    interruption: Arc<InterruptionCoordinator>,
}

impl PlanningCoordinator {
    pub fn new(
        creators: Arc<PlanCreatorRegistry>,
        executors: Arc<PlanExecutorFactory>,
        finalizer: Arc<PlanFinalizer>,
        pool: Arc<LevelBasedExecutorPool>,
        interruption: Arc<InterruptionCoordinator>,
    ) -> Self {
        Self {
            creators,
            executors,
            finalizer,
            pool,
            interruption,
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Create a plan for `request.user_query`, then execute and finalize it.
    pub fn execute_by_user_query(&self, request: UserQueryRequest) -> PlanExecutionHandle {
        let this = self.clone();
        let depth = request.plan_depth;
        PlanExecutionHandle::new(self.pool.spawn(depth, async move {
            let plan_id = request.current_plan_id.clone();
            match this.run_user_query(request).await {
                Ok(result) => result,
                Err(e) => {
                    error!("[PlanningCoordinator] Plan {} failed: {}", plan_id, e);
                    PlanExecutionResult::failed(format!("Plan execution failed: {}", e))
                }
            }
        }))
    }

    /// Execute a caller-supplied plan and finalize it.
    pub fn execute_by_plan(&self, request: DirectPlanRequest) -> PlanExecutionHandle {
        let this = self.clone();
        let depth = request.plan_depth;
        PlanExecutionHandle::new(self.pool.spawn(depth, async move {
            let ctx = Self::build_direct_context(request);
            let plan_id = ctx.current_plan_id.clone();
            match this.execute_and_finalize(ctx).await {
                Ok(result) => result,
                Err(e) => {
                    error!("[PlanningCoordinator] Direct plan {} failed: {}", plan_id, e);
                    PlanExecutionResult::failed(format!("Direct plan execution failed: {}", e))
                }
            }
        }))
    }

    /// Execution context for a direct plan request.
    ///
    /// Only root UI requests without a tool call need a summary; a
    /// conversation id is generated when absent.
    pub fn build_direct_context(request: DirectPlanRequest) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(request.root_plan_id, request.current_plan_id);
        ctx.parent_plan_id = request.parent_plan_id;
        ctx.user_request = request.plan.effective_user_request();
        ctx.need_summary = request.tool_call_id.is_none() && request.is_root_ui_request;
        ctx.conversation_id = Some(
            request
                .conversation_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(generate_conversation_id),
        );
        ctx.use_conversation = true;
        ctx.tool_call_id = request.tool_call_id;
        ctx.upload_key = request.upload_key;
        ctx.plan_depth = request.plan_depth;
        ctx.plan = Some(request.plan);
        ctx
    }

    // ========================================================================
    // Pipeline stages
    // ========================================================================

    async fn run_user_query(&self, request: UserQueryRequest) -> AppResult<PlanExecutionResult> {
        let plan_type = request
            .plan_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.creators.default_type().to_string());

        let mut ctx = ExecutionContext::new(request.root_plan_id, request.current_plan_id);
        ctx.parent_plan_id = request.parent_plan_id;
        ctx.user_request = request.user_query;
        ctx.conversation_id = request.conversation_id;
        ctx.tool_call_id = request.tool_call_id;
        ctx.plan_depth = request.plan_depth;
        ctx.need_summary = true;
        ctx.use_conversation = false;

        let creator = self.creators.resolve(&plan_type)?;
        creator.create_plan(&mut ctx, false).await?;
        if ctx.plan.is_none() {
            warn!(
                "[PlanningCoordinator] Creator '{}' produced no plan for {}",
                plan_type, ctx.current_plan_id
            );
            return Ok(PlanExecutionResult::failed(PLAN_CREATION_FAILED_MESSAGE));
        }

        self.execute_and_finalize(ctx).await
    }

    async fn execute_and_finalize(&self, mut ctx: ExecutionContext) -> AppResult<PlanExecutionResult> {
        let executor = match ctx.plan.as_ref() {
            Some(plan) => self.executors.create_executor(plan),
            None => return Ok(PlanExecutionResult::failed(PLAN_CREATION_FAILED_MESSAGE)),
        };
        self.register_root_task(&ctx).await;

        info!(
            "[PlanningCoordinator] Executing plan {} (root {}) with {}",
            ctx.current_plan_id,
            ctx.root_plan_id(),
            executor.name()
        );
        let result = executor.execute_all_steps(&mut ctx).await?;
        self.finalizer.handle_post_execution(&ctx, result).await
    }

    /// Root-level executions get a START row unless one already exists, so a
    /// pause issued before the plan starts is not overwritten.
    async fn register_root_task(&self, ctx: &ExecutionContext) {
        if !(ctx.is_root_level() && ctx.is_root_plan()) {
            return;
        }
        if self.interruption.task_exists(ctx.root_plan_id()).await {
            return;
        }
        match self
            .interruption
            .create_or_update_task(ctx.root_plan_id(), DesiredTaskState::Start)
            .await
        {
            Ok(_) => debug!("[PlanningCoordinator] Registered root task {}", ctx.root_plan_id()),
            Err(e) => warn!(
                "[PlanningCoordinator] Failed to register root task {}: {}",
                ctx.root_plan_id(),
                e
            ),
        }
    }
}
