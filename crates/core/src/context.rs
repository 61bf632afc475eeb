//! Tool Context
//!
//! Immutable context threaded through every tool invocation. Fan-out tasks
//! each receive their own copy, so concurrently running tools never share a
//! mutable context.
//!
//! Two values travel downward through nested calls:
//! - `tool_call_id` keeps nested calls attributable to the originating call
//! - `plan_depth` tells sub-plans how deeply nested they are

use serde::{Deserialize, Serialize};

use crate::ids::generate_tool_call_id;

/// Context for tool-level execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContext {
    tool_call_id: Option<String>,
    plan_depth: Option<u32>,
    current_plan_id: Option<String>,
    root_plan_id: Option<String>,
}

impl ToolContext {
    /// Context for a top-level call with no parent.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub fn with_plan_depth(mut self, depth: u32) -> Self {
        self.plan_depth = Some(depth);
        self
    }

    pub fn with_plan_ids(
        mut self,
        current_plan_id: impl Into<String>,
        root_plan_id: impl Into<String>,
    ) -> Self {
        self.current_plan_id = Some(current_plan_id.into());
        self.root_plan_id = Some(root_plan_id.into());
        self
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    pub fn plan_depth(&self) -> Option<u32> {
        self.plan_depth
    }

    pub fn current_plan_id(&self) -> Option<&str> {
        self.current_plan_id.as_deref()
    }

    pub fn root_plan_id(&self) -> Option<&str> {
        self.root_plan_id.as_deref()
    }

    /// Derive the context handed to a child call.
    ///
    /// The parent's tool call id is kept when present, otherwise a fresh one
    /// is generated. Plan depth and plan ids are propagated unchanged.
    pub fn child(&self) -> Self {
        let tool_call_id = self
            .tool_call_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_tool_call_id);
        Self {
            tool_call_id: Some(tool_call_id),
            plan_depth: self.plan_depth,
            current_plan_id: self.current_plan_id.clone(),
            root_plan_id: self.root_plan_id.clone(),
        }
    }
}
