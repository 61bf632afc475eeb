//! Settings Models
//!
//! Runtime configuration stored in config.json.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Runtime configuration for the orchestration core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Debug mode disables streaming early termination
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "default_true")]
    pub early_termination_enabled: bool,
    /// Chunks folded before early termination may arm
    #[serde(default = "default_min_chunks")]
    pub early_termination_min_chunks: usize,
    #[serde(default = "default_progress_interval")]
    pub progress_log_interval_secs: u64,
    /// Rows whose end time is older than this many days are swept
    #[serde(default = "default_retention_days")]
    pub task_retention_days: i64,
    #[serde(default = "default_sweep_interval")]
    pub retention_sweep_interval_secs: u64,
    /// Concurrent plans per nesting depth; deeper levels share the last entry
    #[serde(default = "default_level_pool_sizes")]
    pub level_pool_sizes: Vec<usize>,
    #[serde(default = "default_plan_type")]
    pub default_plan_type: String,
    /// Task database location; the data directory is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_min_chunks() -> usize {
    10
}

fn default_progress_interval() -> u64 {
    10
}

fn default_retention_days() -> i64 {
    7
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_level_pool_sizes() -> Vec<usize> {
    vec![8, 4, 2]
}

fn default_plan_type() -> String {
    "simple".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            early_termination_enabled: true,
            early_termination_min_chunks: default_min_chunks(),
            progress_log_interval_secs: default_progress_interval(),
            task_retention_days: default_retention_days(),
            retention_sweep_interval_secs: default_sweep_interval(),
            level_pool_sizes: default_level_pool_sizes(),
            default_plan_type: default_plan_type(),
            database_path: None,
        }
    }
}

/// Partial update of the runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfigUpdate {
    pub debug_mode: Option<bool>,
    pub early_termination_enabled: Option<bool>,
    pub early_termination_min_chunks: Option<usize>,
    pub progress_log_interval_secs: Option<u64>,
    pub task_retention_days: Option<i64>,
    pub retention_sweep_interval_secs: Option<u64>,
    pub level_pool_sizes: Option<Vec<usize>>,
    pub default_plan_type: Option<String>,
}

impl RuntimeConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: RuntimeConfigUpdate) {
        if let Some(debug) = update.debug_mode {
            self.debug_mode = debug;
        }
        if let Some(enabled) = update.early_termination_enabled {
            self.early_termination_enabled = enabled;
        }
        if let Some(min) = update.early_termination_min_chunks {
            self.early_termination_min_chunks = min;
        }
        if let Some(secs) = update.progress_log_interval_secs {
            self.progress_log_interval_secs = secs;
        }
        if let Some(days) = update.task_retention_days {
            self.task_retention_days = days;
        }
        if let Some(secs) = update.retention_sweep_interval_secs {
            self.retention_sweep_interval_secs = secs;
        }
        if let Some(sizes) = update.level_pool_sizes {
            self.level_pool_sizes = sizes;
        }
        if let Some(plan_type) = update.default_plan_type {
            self.default_plan_type = plan_type;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.early_termination_min_chunks == 0 {
            return Err("earlyTerminationMinChunks must be at least 1".to_string());
        }
        if self.progress_log_interval_secs == 0 {
            return Err("progressLogIntervalSecs must be at least 1".to_string());
        }
        if self.task_retention_days < 0 {
            return Err("taskRetentionDays must not be negative".to_string());
        }
        if self.retention_sweep_interval_secs == 0 {
            return Err("retentionSweepIntervalSecs must be at least 1".to_string());
        }
        if self.level_pool_sizes.is_empty() || self.level_pool_sizes.contains(&0) {
            return Err("levelPoolSizes must be non-empty and every size at least 1".to_string());
        }
        if self.default_plan_type.trim().is_empty() {
            return Err("defaultPlanType must not be empty".to_string());
        }
        Ok(())
    }
}
