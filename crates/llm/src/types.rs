//! LLM Types
//!
//! Chat request and error types shared by chunk sources and the aggregator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// A streaming chat request handed to a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Conversation the provider should attach memory to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Errors raised by chunk sources and the aggregator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Server error ({status:?}): {message}")]
    ServerError {
        message: String,
        status: Option<u16>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Upstream failure observed while aggregating a stream
    #[error("Stream failed in {context}: {message}")]
    Stream { context: String, message: String },

    #[error("{message}")]
    Other { message: String },
}

impl LlmError {
    /// Wrap an upstream failure seen while aggregating `context`.
    pub fn stream(context: impl Into<String>, source: &LlmError) -> Self {
        Self::Stream {
            context: context.into(),
            message: source.to_string(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::ServerError { status, .. } => *status,
            LlmError::RateLimited { .. } => Some(429),
            LlmError::AuthenticationFailed { .. } => Some(401),
            LlmError::InvalidRequest { .. } => Some(400),
            _ => None,
        }
    }
}

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Convert LlmError to a string
impl From<LlmError> for String {
    fn from(err: LlmError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_wraps_source_message() {
        let upstream = LlmError::NetworkError {
            message: "connection reset".into(),
        };
        let wrapped = LlmError::stream("summary", &upstream);
        assert_eq!(
            wrapped.to_string(),
            "Stream failed in summary: Network error: connection reset"
        );
    }

    #[test]
    fn test_status_mapping() {
        let err = LlmError::ServerError {
            message: "bad gateway".into(),
            status: Some(502),
        };
        assert_eq!(err.status(), Some(502));
        assert_eq!(
            LlmError::Other {
                message: "x".into()
            }
            .status(),
            None
        );
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest::new(vec![Message::user("hello")])
            .with_conversation_id("conversation-1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["conversationId"], "conversation-1");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("system").is_none());
    }
}
