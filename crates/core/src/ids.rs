//! Identifier generation for plans, tool calls and conversations.

use uuid::Uuid;

/// Prefix for tool call identifiers
pub const TOOL_CALL_PREFIX: &str = "toolcall-";
/// Prefix for parallel function registry entries
pub const PARALLEL_EXECUTION_PREFIX: &str = "parallel-";
/// Prefix for conversation identifiers
pub const CONVERSATION_PREFIX: &str = "conversation-";
/// Prefix for plan identifiers
pub const PLAN_PREFIX: &str = "plan-";

fn with_prefix(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple())
}

pub fn generate_tool_call_id() -> String {
    with_prefix(TOOL_CALL_PREFIX)
}

pub fn generate_parallel_execution_id() -> String {
    with_prefix(PARALLEL_EXECUTION_PREFIX)
}

pub fn generate_conversation_id() -> String {
    with_prefix(CONVERSATION_PREFIX)
}

pub fn generate_plan_id() -> String {
    with_prefix(PLAN_PREFIX)
}
