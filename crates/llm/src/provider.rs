//! LLM Provider Trait
//!
//! The chunk-source seam. Providers turn a chat request into a finite,
//! single-subscriber stream of partial responses; the aggregator folds that
//! stream into one result. Dropping the stream cancels the subscription.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::types::{ChatRequest, LlmError, LlmResult};
use plan_relay_core::streaming::ChatChunk;

/// Stream of partial chat responses in emission order.
pub type ChunkStream = BoxStream<'static, LlmResult<ChatChunk>>;

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Open a streaming chat completion.
    async fn stream_chat(&self, request: ChatRequest) -> LlmResult<ChunkStream>;
}

/// Classify an HTTP failure reported by a provider endpoint.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed {
            message: format!("{}: {}", provider, body),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{stream, StreamExt};

    struct ScriptedProvider {
        chunks: Vec<ChatChunk>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn stream_chat(&self, _request: ChatRequest) -> LlmResult<ChunkStream> {
            Ok(stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed())
        }
    }

    #[tokio::test]
    async fn test_provider_stream_yields_in_order() {
        let provider = ScriptedProvider {
            chunks: vec![ChatChunk::text("a"), ChatChunk::text("b")],
        };
        let stream = provider.stream_chat(ChatRequest::default()).await.unwrap();
        let texts: Vec<String> = stream
            .map(|c| c.unwrap().text.unwrap_or_default())
            .collect()
            .await;
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_http_error() {
        let err = parse_http_error(401, "unauthorized", "openai");
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));

        let err = parse_http_error(429, "rate limited", "openai");
        assert!(matches!(err, LlmError::RateLimited { .. }));

        let err = parse_http_error(503, "unavailable", "openai");
        assert_eq!(err.status(), Some(503));
    }
}
