//! Integration Tests Module
//!
//! Cross-component tests for Plan Relay. They cover the SQLite-backed
//! interruption coordinator shared by several workers, the plan pipeline
//! end to end, and tool fan-out fed by streamed model output.

// Desired-state coordination over a shared SQLite file
mod interruption_store_test;

// Pipeline entry points wired through RelayState
mod pipeline_test;

// Streaming aggregation feeding parallel tool execution
mod tool_streaming_test;
