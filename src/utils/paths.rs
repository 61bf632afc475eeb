//! Cross-Platform Path Utilities
//!
//! Resolves where Plan Relay keeps its config file and task database.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the Plan Relay data directory (`<data dir>/plan-relay/`)
pub fn plan_relay_dir() -> AppResult<PathBuf> {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|base| base.join("plan-relay"))
        .ok_or_else(|| AppError::config("Could not determine data directory"))
}

/// Get the config file path (`<data dir>/plan-relay/config.json`)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(plan_relay_dir()?.join("config.json"))
}

/// Get the default task database path (`<data dir>/plan-relay/tasks.db`)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(plan_relay_dir()?.join("tasks.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
