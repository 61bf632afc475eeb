//! Plan Relay Core
//!
//! Foundational types shared by every crate in the Plan Relay workspace.
//! This crate has no dependency on storage, LLM providers or the pipeline.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `context` - Immutable `ToolContext` propagated through nested calls
//! - `streaming` - Partial chat response chunks and usage counters
//! - `events` - `PlanEvent` and the fire-and-forget `EventPublisher` sink
//! - `ids` - Prefixed identifier generation

pub mod context;
pub mod error;
pub mod events;
pub mod ids;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Context ────────────────────────────────────────────────────────────
pub use context::ToolContext;

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{ChatChunk, RateLimit, TokenUsage, ToolCallRequest};

// ── Events ─────────────────────────────────────────────────────────────
pub use events::{EventPublisher, NoopEventPublisher, PlanEvent};
#[cfg(any(test, feature = "test-util"))]
pub use events::CollectingEventPublisher;
