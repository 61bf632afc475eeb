//! Storage Layer
//!
//! Handles all data persistence: the SQLite task database, the in-memory
//! task store, and JSON config.

pub mod config;
pub mod database;
pub mod memory_store;
pub mod task_store;

pub use config::*;
pub use database::*;
pub use memory_store::*;
pub use task_store::*;
