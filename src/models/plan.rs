//! Plan Models
//!
//! Plans produced by plan creators and consumed by executors, plus the
//! result object every pipeline entry point resolves to.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::root_task::DesiredTaskState;

/// Plan type used when a request does not name one.
pub const DEFAULT_PLAN_TYPE: &str = "simple";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    #[serde(default)]
    pub step_index: usize,
    /// Natural-language instruction
    pub step_requirement: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    /// Tools available to this step
    #[serde(default)]
    pub selected_tool_keys: BTreeSet<String>,
    /// Schema hint for structured step output
    #[serde(default)]
    pub terminate_columns: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
}

impl ExecutionStep {
    pub fn new(step_requirement: impl Into<String>) -> Self {
        Self {
            step_index: 0,
            step_requirement: step_requirement.into(),
            agent_name: None,
            model_name: None,
            selected_tool_keys: BTreeSet::new(),
            terminate_columns: None,
            result: None,
            status: StepStatus::NotStarted,
        }
    }

    pub fn with_agent(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn with_tools<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tool_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_terminate_columns(mut self, columns: impl Into<String>) -> Self {
        self.terminate_columns = Some(columns.into());
        self
    }
}

/// A multi-step plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Discriminator used to select an executor
    pub plan_type: String,
    pub title: String,
    #[serde(default)]
    pub user_request: Option<String>,
    #[serde(default)]
    pub steps: Vec<ExecutionStep>,
    #[serde(default)]
    pub current_plan_id: Option<String>,
    #[serde(default)]
    pub root_plan_id: Option<String>,
    /// Answer the request directly instead of executing steps
    #[serde(default)]
    pub direct_response: bool,
}

impl Plan {
    pub fn new(plan_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            plan_type: plan_type.into(),
            title: title.into(),
            user_request: None,
            steps: Vec::new(),
            current_plan_id: None,
            root_plan_id: None,
            direct_response: false,
        }
    }

    pub fn with_user_request(mut self, request: impl Into<String>) -> Self {
        self.user_request = Some(request.into());
        self
    }

    /// Append a step, assigning its index.
    pub fn with_step(mut self, mut step: ExecutionStep) -> Self {
        step.step_index = self.steps.len();
        self.steps.push(step);
        self
    }

    pub fn with_direct_response(mut self, direct: bool) -> Self {
        self.direct_response = direct;
        self
    }

    /// The plan's own request, falling back to its title.
    pub fn effective_user_request(&self) -> String {
        self.user_request
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(&self.title)
            .to_string()
    }

    /// Step-by-step account of what ran, for summary prompts.
    pub fn execution_summary(&self) -> String {
        let mut out = format!("Plan: {}\n", self.title);
        for step in &self.steps {
            out.push_str(&format!(
                "Step {} [{:?}]: {}\n",
                step.step_index + 1,
                step.status,
                step.step_requirement
            ));
            if let Some(result) = &step.result {
                out.push_str(&format!("Result: {}\n", result));
            }
        }
        out
    }
}

/// Record of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_index: usize,
    pub step_requirement: String,
    pub result: String,
    pub status: StepStatus,
    pub agent_name: Option<String>,
}

/// Outcome of a plan execution. Pipeline entry points always resolve to one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanExecutionResult {
    pub success: bool,
    pub final_result: Option<String>,
    pub error_message: Option<String>,
    pub step_results: Vec<StepResult>,
    /// Desired state observed when the step loop stopped early
    pub interrupted_state: Option<DesiredTaskState>,
    /// Index of the last step that ran before an interruption
    pub last_step_index: Option<usize>,
}

impl PlanExecutionResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn succeeded(final_result: impl Into<String>) -> Self {
        Self {
            success: true,
            final_result: Some(final_result.into()),
            ..Default::default()
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted_state.is_some()
            || self
                .error_message
                .as_deref()
                .map(|m| {
                    let lower = m.to_lowercase();
                    lower.contains("interrupted") || lower.contains("interruption")
                })
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_step_assigns_indices() {
        let plan = Plan::new("simple", "Research")
            .with_step(ExecutionStep::new("search"))
            .with_step(ExecutionStep::new("summarize").with_agent("writer"));
        assert_eq!(plan.steps[0].step_index, 0);
        assert_eq!(plan.steps[1].step_index, 1);
        assert_eq!(plan.steps[1].agent_name.as_deref(), Some("writer"));
    }

    #[test]
    fn test_effective_user_request_falls_back_to_title() {
        let plan = Plan::new("simple", "Title only");
        assert_eq!(plan.effective_user_request(), "Title only");
        let plan = plan.with_user_request("  ");
        assert_eq!(plan.effective_user_request(), "Title only");
        let plan = plan.with_user_request("Do the thing");
        assert_eq!(plan.effective_user_request(), "Do the thing");
    }

    #[test]
    fn test_plan_deserializes_camel_case() {
        let plan: Plan = serde_json::from_str(
            r#"{"planType":"dynamic_agent","title":"t","steps":[{"stepRequirement":"go","selectedToolKeys":["a","b"]}]}"#,
        )
        .unwrap();
        assert_eq!(plan.plan_type, "dynamic_agent");
        assert_eq!(plan.steps[0].selected_tool_keys.len(), 2);
        assert_eq!(plan.steps[0].status, StepStatus::NotStarted);
    }

    #[test]
    fn test_is_interrupted_detects_message() {
        let result = PlanExecutionResult::failed("Plan execution interrupted by user");
        assert!(result.is_interrupted());
        assert!(!PlanExecutionResult::failed("network down").is_interrupted());
    }

    #[test]
    fn test_execution_summary_lists_results() {
        let mut plan = Plan::new("simple", "Trip").with_step(ExecutionStep::new("book flight"));
        plan.steps[0].result = Some("booked".into());
        let summary = plan.execution_summary();
        assert!(summary.contains("Step 1"));
        assert!(summary.contains("Result: booked"));
    }
}
