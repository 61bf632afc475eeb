//! Streaming Aggregator
//!
//! Folds a single-subscriber stream of partial chat responses into one
//! immutable [`StreamingResult`].
//!
//! Folding rules, applied strictly in emission order:
//! - text deltas are appended
//! - tool calls are appended, never deduplicated
//! - metadata entries are merged, last write wins per key
//! - usage counters are overwritten only by positive values
//! - `id`, `model`, rate limit, prompt metadata and finish reason keep the
//!   last non-empty value seen
//!
//! ## Early termination
//!
//! When enabled (and not in debug mode), a response that has produced text
//! but no tool call after `min_chunks` chunks is treated as the model thinking
//! out loud. The stream is armed at that point. The next chunk decides: if it
//! carries a tool call the stream is disarmed and folded as usual, otherwise
//! that chunk is discarded and the subscription is dropped.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use plan_relay_core::events::{EventPublisher, NoopEventPublisher, PlanEvent};
use plan_relay_core::streaming::{ChatChunk, RateLimit, TokenUsage, ToolCallRequest};

use crate::preview::{head_preview, head_tail_preview, tail_preview, PREVIEW_HEAD_CHARS, PREVIEW_TAIL_CHARS};
use crate::trace::LlmTraceRecorder;
use crate::types::{LlmError, LlmResult};

/// Chunks folded before early termination may arm.
pub const DEFAULT_EARLY_TERMINATION_MIN_CHUNKS: usize = 10;
/// Wall-clock interval between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// Options and result
// ============================================================================

/// Per-call aggregation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationOptions {
    /// Label used in logs and events, e.g. "step 3" or "summary"
    pub context_name: String,
    pub plan_id: String,
    pub debug_mode: bool,
    /// Must be off for plain text generation that never produces tool calls
    pub enable_early_termination: bool,
}

impl AggregationOptions {
    pub fn new(context_name: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            context_name: context_name.into(),
            plan_id: plan_id.into(),
            debug_mode: false,
            enable_early_termination: true,
        }
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_early_termination(mut self, enabled: bool) -> Self {
        self.enable_early_termination = enabled;
        self
    }

    fn early_termination_active(&self) -> bool {
        !self.debug_mode && self.enable_early_termination
    }
}

/// Aggregated outcome of one stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingResult {
    text: String,
    tool_calls: Vec<ToolCallRequest>,
    metadata: HashMap<String, Value>,
    usage: TokenUsage,
    id: Option<String>,
    model: Option<String>,
    rate_limit: Option<RateLimit>,
    prompt_metadata: Vec<Value>,
    finish_reason: Option<String>,
    chunk_count: usize,
    early_terminated: bool,
    elapsed_ms: u64,
}

impl StreamingResult {
    /// Accumulated text; empty when no chunk carried text.
    pub fn effective_text(&self) -> &str {
        &self.text
    }

    /// Accumulated tool calls; empty when no chunk carried any.
    pub fn effective_tool_calls(&self) -> &[ToolCallRequest] {
        &self.tool_calls
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }

    pub fn prompt_metadata(&self) -> &[Value] {
        &self.prompt_metadata
    }

    /// Last generation finish reason reported by the model.
    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    /// Number of chunks folded into this result.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn early_terminated(&self) -> bool {
        self.early_terminated
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ============================================================================
// Fold
// ============================================================================

#[derive(Debug, Default)]
struct ChunkAccumulator {
    text: String,
    tool_calls: Vec<ToolCallRequest>,
    metadata: HashMap<String, Value>,
    usage: TokenUsage,
    id: Option<String>,
    model: Option<String>,
    rate_limit: Option<RateLimit>,
    prompt_metadata: Vec<Value>,
    finish_reason: Option<String>,
    chunk_count: usize,
}

impl ChunkAccumulator {
    fn fold(&mut self, chunk: ChatChunk) {
        self.chunk_count += 1;

        if let Some(text) = chunk.text {
            self.text.push_str(&text);
        }
        self.tool_calls.extend(chunk.tool_calls);
        self.metadata.extend(chunk.metadata);

        if let Some(usage) = chunk.usage {
            self.usage.merge_positive(&usage);
        }
        if let Some(id) = chunk.id.filter(|s| !s.is_empty()) {
            self.id = Some(id);
        }
        if let Some(model) = chunk.model.filter(|s| !s.is_empty()) {
            self.model = Some(model);
        }
        if let Some(limit) = chunk.rate_limit.filter(|l| !l.is_empty()) {
            self.rate_limit = Some(limit);
        }
        if !chunk.prompt_metadata.is_empty() {
            self.prompt_metadata = chunk.prompt_metadata;
        }
        if let Some(reason) = chunk.finish_reason.filter(|s| !s.is_empty()) {
            self.finish_reason = Some(reason);
        }
    }

    fn text_chars(&self) -> usize {
        self.text.chars().count()
    }

    fn finish(self, early_terminated: bool, elapsed: Duration) -> StreamingResult {
        StreamingResult {
            text: self.text,
            tool_calls: self.tool_calls,
            metadata: self.metadata,
            usage: self.usage,
            id: self.id,
            model: self.model,
            rate_limit: self.rate_limit,
            prompt_metadata: self.prompt_metadata,
            finish_reason: self.finish_reason,
            chunk_count: self.chunk_count,
            early_terminated,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

// ============================================================================
// StreamingAggregator
// ============================================================================

pub struct StreamingAggregator {
    publisher: Arc<dyn EventPublisher>,
    min_chunks: usize,
    progress_interval: Duration,
}

impl Default for StreamingAggregator {
    fn default() -> Self {
        Self::new(Arc::new(NoopEventPublisher))
    }
}

impl StreamingAggregator {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            min_chunks: DEFAULT_EARLY_TERMINATION_MIN_CHUNKS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_min_chunks(mut self, min_chunks: usize) -> Self {
        self.min_chunks = min_chunks.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Fold `stream` into a [`StreamingResult`].
    ///
    /// Upstream errors are traced, published as `PlanException` and returned
    /// wrapped in [`LlmError::Stream`]; they are never swallowed.
    pub async fn aggregate<S>(&self, stream: S, options: &AggregationOptions) -> LlmResult<StreamingResult>
    where
        S: Stream<Item = LlmResult<ChatChunk>>,
    {
        let trace = LlmTraceRecorder::begin();
        let started = Instant::now();
        let mut last_progress = started;
        let mut acc = ChunkAccumulator::default();
        let early_termination = options.early_termination_active();
        let mut armed = false;
        let mut early_terminated = false;

        let mut stream = pin!(stream);
        while let Some(item) = stream.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => return Err(self.fail(&trace, options, &acc, started, e)),
            };

            if armed {
                if chunk.has_tool_calls() {
                    debug!(
                        "[StreamingAggregator] {} committed to a tool call after {} chunks, continuing",
                        options.context_name, acc.chunk_count
                    );
                    armed = false;
                } else {
                    early_terminated = true;
                    break;
                }
            }

            acc.fold(chunk);

            if early_termination
                && !armed
                && acc.chunk_count >= self.min_chunks
                && !acc.text.trim().is_empty()
                && acc.tool_calls.is_empty()
            {
                armed = true;
            }

            if last_progress.elapsed() >= self.progress_interval {
                self.report_progress(options, &acc, started.elapsed());
                last_progress = Instant::now();
            }
        }

        if early_terminated {
            info!(
                "[StreamingAggregator] Early termination for {} (plan {}): {} chunks, {} chars, no tool calls",
                options.context_name,
                options.plan_id,
                acc.chunk_count,
                acc.text_chars()
            );
            self.publisher.publish(PlanEvent::StreamEarlyTerminated {
                context_name: options.context_name.clone(),
                plan_id: options.plan_id.clone(),
                chunk_count: acc.chunk_count,
                text_length: acc.text_chars(),
            });
        }

        let elapsed = started.elapsed();
        info!(
            "[StreamingAggregator] {} completed in {}ms: {} chunks, {} chars, {} tool calls, preview: {}",
            options.context_name,
            elapsed.as_millis(),
            acc.chunk_count,
            acc.text_chars(),
            acc.tool_calls.len(),
            head_preview(&acc.text, PREVIEW_HEAD_CHARS)
        );

        let result = acc.finish(early_terminated, elapsed);
        trace.record_response(&result);
        Ok(result)
    }

    /// Aggregate a plain text-generation stream and return its text.
    ///
    /// Early termination is always off here since such flows never produce
    /// tool calls.
    pub async fn process_text_stream<S>(&self, stream: S, context_name: &str, plan_id: &str) -> LlmResult<String>
    where
        S: Stream<Item = LlmResult<ChatChunk>>,
    {
        let options = AggregationOptions::new(context_name, plan_id).with_early_termination(false);
        let result = self.aggregate(stream, &options).await?;
        Ok(result.into_text())
    }

    fn report_progress(&self, options: &AggregationOptions, acc: &ChunkAccumulator, elapsed: Duration) {
        let chars = acc.text_chars();
        let secs = elapsed.as_secs_f64();
        let chars_per_second = if secs > 0.0 { chars as f64 / secs } else { 0.0 };

        info!(
            target: "streaming_progress",
            "[{}] elapsed={}ms chunks={} chars={} chars/sec={:.1} tool_calls={} last: {}",
            options.context_name,
            elapsed.as_millis(),
            acc.chunk_count,
            chars,
            chars_per_second,
            acc.tool_calls.len(),
            tail_preview(&acc.text, 100)
        );

        self.publisher.publish(PlanEvent::StreamProgress {
            context_name: options.context_name.clone(),
            plan_id: options.plan_id.clone(),
            elapsed_ms: elapsed.as_millis() as u64,
            chunk_count: acc.chunk_count,
            text_length: chars,
            tool_call_count: acc.tool_calls.len(),
            chars_per_second,
        });
    }

    fn fail(
        &self,
        trace: &LlmTraceRecorder,
        options: &AggregationOptions,
        acc: &ChunkAccumulator,
        started: Instant,
        upstream: LlmError,
    ) -> LlmError {
        trace.record_error(&upstream);
        error!(
            "[StreamingAggregator] Stream failed in {} (plan {}) after {}ms, {} chunks, {} tool calls: {}. Partial text: {}",
            options.context_name,
            options.plan_id,
            started.elapsed().as_millis(),
            acc.chunk_count,
            acc.tool_calls.len(),
            upstream,
            head_tail_preview(&acc.text, PREVIEW_HEAD_CHARS, PREVIEW_TAIL_CHARS)
        );
        self.publisher.publish(PlanEvent::PlanException {
            plan_id: options.plan_id.clone(),
            message: upstream.to_string(),
        });
        LlmError::stream(&options.context_name, &upstream)
    }
}
