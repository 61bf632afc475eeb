//! Stream Chunk Types
//!
//! Provider-agnostic partial chat responses. A chunk source yields these in
//! emission order and the aggregator in the LLM crate folds them into one
//! result. These types are shared by the LLM crate (aggregation), the tools
//! crate (executing requested tool calls) and the main crate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as emitted by the model
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Token usage counters reported by the model.
///
/// Usage normally arrives once, on the final chunk, so the counters are
/// overwritten by positive values rather than summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    /// Overwrite each counter for which `incoming` reports a positive value.
    pub fn merge_positive(&mut self, incoming: &TokenUsage) {
        if incoming.prompt_tokens > 0 {
            self.prompt_tokens = incoming.prompt_tokens;
        }
        if incoming.completion_tokens > 0 {
            self.completion_tokens = incoming.completion_tokens;
        }
        if incoming.total_tokens > 0 {
            self.total_tokens = incoming.total_tokens;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prompt_tokens == 0 && self.completion_tokens == 0 && self.total_tokens == 0
    }
}

/// Provider rate-limit snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_remaining: Option<u64>,
}

impl RateLimit {
    pub fn is_empty(&self) -> bool {
        self.requests_limit.is_none()
            && self.requests_remaining.is_none()
            && self.tokens_limit.is_none()
            && self.tokens_remaining.is_none()
    }
}

/// One partial chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatChunk {
    /// Text delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Tool calls completed in this chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Per-chunk metadata entries
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Response id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompt_metadata: Vec<Value>,
}

impl ChatChunk {
    /// Chunk carrying only a text delta.
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            text: Some(delta.into()),
            ..Default::default()
        }
    }

    /// Chunk carrying a single tool call.
    pub fn tool_call(call: ToolCallRequest) -> Self {
        Self {
            tool_calls: vec![call],
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_identity(mut self, id: impl Into<String>, model: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self.model = Some(model.into());
        self
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_positive_keeps_previous_on_zero() {
        let mut usage = TokenUsage::default();
        for prompt in [0, 0, 50, 0] {
            usage.merge_positive(&TokenUsage::new(prompt, 0, 0));
        }
        assert_eq!(usage.prompt_tokens, 50);
    }

    #[test]
    fn test_merge_positive_is_overwrite_not_sum() {
        let mut usage = TokenUsage::new(10, 5, 15);
        usage.merge_positive(&TokenUsage::new(12, 0, 20));
        assert_eq!(usage, TokenUsage::new(12, 5, 20));
    }

    #[test]
    fn test_chunk_serialization_is_camel_case() {
        let chunk = ChatChunk::tool_call(ToolCallRequest::new("call_1", "search", "{}"))
            .with_finish_reason("tool_calls");
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("toolCalls").is_some());
        assert_eq!(json["finishReason"], "tool_calls");
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_chunk_deserializes_with_defaults() {
        let chunk: ChatChunk = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(chunk.text.as_deref(), Some("hi"));
        assert!(!chunk.has_tool_calls());
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn test_rate_limit_is_empty() {
        assert!(RateLimit::default().is_empty());
        let limit = RateLimit {
            requests_remaining: Some(3),
            ..Default::default()
        };
        assert!(!limit.is_empty());
    }
}
