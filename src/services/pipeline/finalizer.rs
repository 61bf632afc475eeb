//! Plan Finalizer
//!
//! Post-processes a raw execution result into what the caller sees:
//! interruption messaging, an LLM summary for requests that need one, or a
//! direct LLM answer for direct-response plans.

use std::sync::Arc;

use tracing::{info, warn};

use plan_relay_core::events::{EventPublisher, NoopEventPublisher, PlanEvent};
use plan_relay_llm::{ChatRequest, LlmProvider, Message, StreamingAggregator};

use crate::models::plan::PlanExecutionResult;
use crate::models::root_task::DesiredTaskState;
use crate::services::interruption::InterruptionCoordinator;
use crate::utils::error::{AppError, AppResult};

use super::context::ExecutionContext;

pub const TASK_INTERRUPTED_MESSAGE: &str = "Task execution was interrupted by user";

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize the outcome of a multi-step task for the \
user who requested it. Answer the request directly using the step results. Be concise.";

const DIRECT_RESPONSE_SYSTEM_PROMPT: &str = "Answer the user's request directly and concisely.";

pub struct PlanFinalizer {
    interruption: Arc<InterruptionCoordinator>,
    llm: Option<Arc<dyn LlmProvider>>,
    aggregator: Arc<StreamingAggregator>,
    publisher: Arc<dyn EventPublisher>,
}

impl PlanFinalizer {
    pub fn new(interruption: Arc<InterruptionCoordinator>) -> Self {
        Self {
            interruption,
            llm: None,
            aggregator: Arc::new(StreamingAggregator::default()),
            publisher: Arc::new(NoopEventPublisher),
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<StreamingAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub async fn handle_post_execution(
        &self,
        ctx: &ExecutionContext,
        mut result: PlanExecutionResult,
    ) -> AppResult<PlanExecutionResult> {
        if result.is_interrupted() {
            result.success = false;
            result.error_message = Some(TASK_INTERRUPTED_MESSAGE.to_string());
            result.final_result = Some(interruption_message(ctx, &result));
        } else if let Some(llm) = self.llm.as_ref() {
            if ctx.need_summary && result.success {
                let summary = self.generate_summary(llm.as_ref(), ctx, &result).await?;
                result.final_result = Some(summary);
            } else if is_direct_response(ctx) {
                // Only the answer text changes; a failed run stays failed.
                let answer = self.generate_direct_response(llm.as_ref(), ctx).await?;
                result.final_result = Some(answer);
            }
        }

        if ctx.is_root_plan() {
            let text = result
                .final_result
                .clone()
                .or_else(|| result.error_message.clone())
                .unwrap_or_default();
            if let Err(e) = self
                .interruption
                .update_task_result(ctx.root_plan_id(), text)
                .await
            {
                warn!(
                    "[PlanFinalizer] Failed to store result for {}: {}",
                    ctx.root_plan_id(),
                    e
                );
            }
        }

        info!(
            "[PlanFinalizer] Plan {} finished (success: {})",
            ctx.current_plan_id, result.success
        );
        self.publisher.publish(PlanEvent::PlanCompleted {
            plan_id: ctx.current_plan_id.clone(),
            success: result.success,
        });
        Ok(result)
    }

    async fn generate_summary(
        &self,
        llm: &dyn LlmProvider,
        ctx: &ExecutionContext,
        result: &PlanExecutionResult,
    ) -> AppResult<String> {
        let mut prompt = format!("User request: {}\n\n", ctx.user_request);
        if let Some(plan) = &ctx.plan {
            prompt.push_str(&plan.execution_summary());
        }
        for step in &result.step_results {
            prompt.push_str(&format!(
                "\nStep {} result: {}",
                step.step_index + 1,
                step.result
            ));
        }

        let request = chat_request(ctx, prompt, SUMMARY_SYSTEM_PROMPT);
        self.stream_text(llm, request, "summary", ctx).await
    }

    async fn generate_direct_response(
        &self,
        llm: &dyn LlmProvider,
        ctx: &ExecutionContext,
    ) -> AppResult<String> {
        let request = chat_request(ctx, ctx.user_request.clone(), DIRECT_RESPONSE_SYSTEM_PROMPT);
        self.stream_text(llm, request, "direct_response", ctx).await
    }

    async fn stream_text(
        &self,
        llm: &dyn LlmProvider,
        request: ChatRequest,
        context_name: &str,
        ctx: &ExecutionContext,
    ) -> AppResult<String> {
        let stream = llm
            .stream_chat(request)
            .await
            .map_err(|e| AppError::post_execution(e.to_string()))?;
        self.aggregator
            .process_text_stream(stream, context_name, &ctx.current_plan_id)
            .await
            .map_err(|e| AppError::post_execution(e.to_string()))
    }
}

fn is_direct_response(ctx: &ExecutionContext) -> bool {
    ctx.plan.as_ref().map(|p| p.direct_response).unwrap_or(false)
}

fn chat_request(ctx: &ExecutionContext, prompt: String, system: &str) -> ChatRequest {
    let mut request = ChatRequest::new(vec![Message::user(prompt)]).with_system(system);
    if ctx.use_conversation {
        if let Some(id) = &ctx.conversation_id {
            request = request.with_conversation_id(id.clone());
        }
    }
    request
}

fn interruption_message(ctx: &ExecutionContext, result: &PlanExecutionResult) -> String {
    let verb = match result.interrupted_state {
        Some(DesiredTaskState::Pause) => "paused",
        Some(DesiredTaskState::Cancel) => "cancelled",
        _ => "stopped",
    };
    let progress = match result.last_step_index {
        Some(index) => format!("after completing step {}", index + 1),
        None => "before any step completed".to_string(),
    };
    format!(
        "Your request \"{}\" was {} {}.",
        ctx.user_request, verb, progress
    )
}
