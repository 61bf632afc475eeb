//! JSON Configuration Management
//!
//! Handles reading and writing the runtime configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::settings::{RuntimeConfig, RuntimeConfigUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing runtime settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: RuntimeConfig,
}

impl ConfigService {
    /// Load the config from the default location, creating it with defaults if missing
    pub fn new() -> AppResult<Self> {
        Self::load_or_create(config_path()?)
    }

    /// Load the config at `path`, creating it with defaults if missing
    pub fn load_or_create(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent() {
            ensure_dir(parent)?;
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            info!("[Config] Writing default config to {}", config_path.display());
            let default_config = RuntimeConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<RuntimeConfig> {
        let content = fs::read_to_string(path)?;
        let config: RuntimeConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &RuntimeConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Apply a partial update; the stored config is left unchanged if it fails validation
    pub fn update_config(&mut self, update: RuntimeConfigUpdate) -> AppResult<RuntimeConfig> {
        let mut candidate = self.config.clone();
        candidate.apply_update(update);
        Self::save_to_file(&self.config_path, &candidate)?;
        self.config = candidate;
        Ok(self.config.clone())
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = RuntimeConfig::default();
        Self::save_to_file(&self.config_path, &self.config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
