//! Tool Trait and Registry
//!
//! Tools are looked up by name and invoked through one polymorphic method
//! taking the input map and an immutable [`ToolContext`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use plan_relay_core::context::ToolContext;
use plan_relay_core::error::CoreResult;

use crate::executor::ToolResult;

/// Tool input: a JSON object.
pub type ToolInput = Map<String, Value>;

/// A named, invokable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the accepted input.
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    /// Run the tool.
    ///
    /// `Err` means the invocation itself failed; a tool that ran and reports
    /// failure returns `Ok(ToolResult::err(..))`.
    async fn execute(&self, ctx: &ToolContext, input: ToolInput) -> CoreResult<ToolResult>;
}

/// Tool description suitable for sending to an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Name-to-tool lookup with stable registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. If a tool with the same name already exists, it is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Unregister a tool by name. Returns the removed tool, or None if not found.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.order.retain(|n| n != name);
        self.tools.remove(name)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// All registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

type FunctionToolHandler =
    Box<dyn Fn(ToolContext, ToolInput) -> BoxFuture<'static, CoreResult<ToolResult>> + Send + Sync>;

/// Closure-backed tool.
///
/// ```ignore
/// let echo = FunctionTool::new("echo", "Echo the message", |_ctx, input| async move {
///     let msg = input.get("message").and_then(|v| v.as_str()).unwrap_or("(empty)");
///     Ok(ToolResult::ok(msg))
/// });
/// ```
pub struct FunctionTool {
    tool_name: String,
    tool_description: String,
    schema: Value,
    handler: FunctionToolHandler,
}

impl FunctionTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ToolContext, ToolInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<ToolResult>> + Send + 'static,
    {
        Self {
            tool_name: name.into(),
            tool_description: description.into(),
            schema: json!({ "type": "object" }),
            handler: Box::new(move |ctx, input| Box::pin(handler(ctx, input))),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.tool_description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, ctx: &ToolContext, input: ToolInput) -> CoreResult<ToolResult> {
        (self.handler)(ctx.clone(), input).await
    }
}
