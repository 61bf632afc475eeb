//! Plan Relay LLM
//!
//! Consumption side of LLM streaming:
//! - `LlmProvider` - the chunk-source seam implemented by hosts
//! - `StreamingAggregator` - folds partial responses into a `StreamingResult`
//!   with the early-termination heuristic
//! - `LlmTraceRecorder` - per-request trace lines
//! - text previews used in log output

pub mod aggregator;
pub mod preview;
pub mod provider;
pub mod trace;
pub mod types;

// Re-export main types
pub use aggregator::{
    AggregationOptions, StreamingAggregator, StreamingResult, DEFAULT_EARLY_TERMINATION_MIN_CHUNKS,
    DEFAULT_PROGRESS_INTERVAL,
};
pub use provider::{parse_http_error, ChunkStream, LlmProvider};
pub use trace::LlmTraceRecorder;
pub use types::*;
