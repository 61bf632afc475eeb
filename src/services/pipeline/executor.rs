//! Plan Executors
//!
//! A [`PlanExecutor`] runs every step of the plan held by an
//! [`ExecutionContext`]. [`SequentialPlanExecutor`] is the default: it runs
//! steps in order through a host-supplied [`StepRunner`] and consults the
//! interruption coordinator at each step boundary.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::plan::{ExecutionStep, Plan, PlanExecutionResult, StepResult, StepStatus};
use crate::models::root_task::DesiredTaskState;
use crate::services::interruption::InterruptionCoordinator;
use crate::utils::error::{AppError, AppResult};

use super::context::ExecutionContext;

pub const PLAN_INTERRUPTED_MESSAGE: &str = "Plan execution interrupted by user";

#[async_trait]
pub trait PlanExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Run all steps of `ctx.plan`.
    async fn execute_all_steps(&self, ctx: &mut ExecutionContext) -> AppResult<PlanExecutionResult>;
}

/// Executes a single step. Implemented by the host (agent loop, tool calls, ...).
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step(&self, ctx: &ExecutionContext, step: &ExecutionStep) -> AppResult<String>;
}

pub struct SequentialPlanExecutor {
    name: String,
    interruption: Arc<InterruptionCoordinator>,
    runner: Arc<dyn StepRunner>,
}

impl SequentialPlanExecutor {
    pub fn new(
        name: impl Into<String>,
        interruption: Arc<InterruptionCoordinator>,
        runner: Arc<dyn StepRunner>,
    ) -> Self {
        Self {
            name: name.into(),
            interruption,
            runner,
        }
    }

    async fn run_steps(
        &self,
        ctx: &ExecutionContext,
        plan: &mut Plan,
    ) -> AppResult<PlanExecutionResult> {
        let mut result = PlanExecutionResult::default();
        let mut last_step_index = None;

        for step in plan.steps.iter_mut() {
            if let Err(e) = self
                .interruption
                .check_and_throw_if_interrupted(ctx.root_plan_id())
                .await
            {
                return match e {
                    AppError::Interrupted { state, .. } => {
                        info!(
                            "[PlanExecutor] Plan {} interrupted before step {} ({})",
                            ctx.current_plan_id,
                            step.step_index + 1,
                            state
                        );
                        result.success = false;
                        result.error_message = Some(PLAN_INTERRUPTED_MESSAGE.to_string());
                        result.interrupted_state = state.parse::<DesiredTaskState>().ok();
                        result.last_step_index = last_step_index;
                        Ok(result)
                    }
                    other => Err(other),
                };
            }

            debug!(
                "[PlanExecutor] Plan {} step {}: {}",
                ctx.current_plan_id,
                step.step_index + 1,
                step.step_requirement
            );
            step.status = StepStatus::InProgress;

            match self.runner.run_step(ctx, step).await {
                Ok(output) => {
                    step.status = StepStatus::Completed;
                    step.result = Some(output.clone());
                    result.step_results.push(step_result(step, output));
                    last_step_index = Some(step.step_index);
                }
                Err(e) => {
                    warn!(
                        "[PlanExecutor] Step {} of plan {} failed: {}",
                        step.step_index + 1,
                        ctx.current_plan_id,
                        e
                    );
                    let message = e.to_string();
                    step.status = StepStatus::Failed;
                    step.result = Some(message.clone());
                    result.step_results.push(step_result(step, message.clone()));
                    result.success = false;
                    result.error_message = Some(message);
                    result.last_step_index = Some(step.step_index);
                    return Ok(result);
                }
            }
        }

        result.success = true;
        result.final_result = result.step_results.last().map(|s| s.result.clone());
        result.last_step_index = last_step_index;
        Ok(result)
    }
}

fn step_result(step: &ExecutionStep, output: String) -> StepResult {
    StepResult {
        step_index: step.step_index,
        step_requirement: step.step_requirement.clone(),
        result: output,
        status: step.status,
        agent_name: step.agent_name.clone(),
    }
}

#[async_trait]
impl PlanExecutor for SequentialPlanExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute_all_steps(&self, ctx: &mut ExecutionContext) -> AppResult<PlanExecutionResult> {
        let mut plan = ctx
            .plan
            .take()
            .ok_or_else(|| AppError::validation("execution context has no plan"))?;
        plan.current_plan_id = Some(ctx.current_plan_id.clone());
        plan.root_plan_id = Some(ctx.root_plan_id().to_string());

        info!(
            "[PlanExecutor] {} executing plan {} ({} steps)",
            self.name,
            ctx.current_plan_id,
            plan.steps.len()
        );
        let outcome = self.run_steps(ctx, &mut plan).await;
        ctx.plan = Some(plan);
        outcome
    }
}
