//! Execution Context
//!
//! Transient state owned by one in-flight plan execution.

use plan_relay_core::context::ToolContext;

use crate::models::plan::Plan;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    root_plan_id: String,
    pub current_plan_id: String,
    /// `None` marks a root-level execution
    pub parent_plan_id: Option<String>,
    pub user_request: String,
    pub conversation_id: Option<String>,
    pub tool_call_id: Option<String>,
    pub need_summary: bool,
    pub use_conversation: bool,
    pub upload_key: Option<String>,
    /// Nesting depth; selects the executor pool level
    pub plan_depth: u32,
    pub plan: Option<Plan>,
}

impl ExecutionContext {
    pub fn new(root_plan_id: impl Into<String>, current_plan_id: impl Into<String>) -> Self {
        Self {
            root_plan_id: root_plan_id.into(),
            current_plan_id: current_plan_id.into(),
            parent_plan_id: None,
            user_request: String::new(),
            conversation_id: None,
            tool_call_id: None,
            need_summary: false,
            use_conversation: false,
            upload_key: None,
            plan_depth: 0,
            plan: None,
        }
    }

    /// Root plan id; fixed for the lifetime of the context.
    pub fn root_plan_id(&self) -> &str {
        &self.root_plan_id
    }

    pub fn is_root_level(&self) -> bool {
        self.parent_plan_id.is_none()
    }

    /// True when this execution is the root plan itself rather than a sub-plan.
    pub fn is_root_plan(&self) -> bool {
        self.current_plan_id == self.root_plan_id
    }

    pub fn plan_type(&self) -> Option<&str> {
        self.plan.as_ref().map(|p| p.plan_type.as_str())
    }

    /// Context handed to tools invoked by this plan's steps.
    pub fn tool_context(&self) -> ToolContext {
        let mut ctx = ToolContext::root()
            .with_plan_ids(self.current_plan_id.clone(), self.root_plan_id.clone())
            .with_plan_depth(self.plan_depth);
        if let Some(id) = &self.tool_call_id {
            ctx = ctx.with_tool_call_id(id.clone());
        }
        ctx
    }
}
