//! # Configuration Management Module
//!
//! Loads and validates the TOML configuration used by the `playerhomes` binary.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - Where home documents live and how corrupt ones are handled
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use playerhomes::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Homes stored in: {}", config.storage.home_folder_path().display());
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//! home_folder = "home"
//! quarantine_corrupt = false
//!
//! [logging]
//! level = "info"
//! file = "playerhomes.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::validation::validate_folder_name;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Folder under `data_dir` holding one document per player.
    #[serde(default = "default_home_folder")]
    pub home_folder: String,
    /// Keep a `.corrupt-<timestamp>` copy of unreadable documents before resetting them.
    #[serde(default)]
    pub quarantine_corrupt: bool,
}

fn default_home_folder() -> String {
    "home".to_string()
}

impl StorageConfig {
    pub fn home_folder_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.home_folder)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Parsed level filter; unknown strings fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir cannot be empty"));
        }
        validate_folder_name(&self.storage.home_folder)
            .map_err(|e| anyhow!("storage.home_folder: {}", e))?;
        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(anyhow!("logging.level '{}' is not a log level", self.logging.level));
        }
        Ok(())
    }

    pub fn home_folder_path(&self) -> PathBuf {
        self.storage.home_folder_path()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                home_folder: default_home_folder(),
                quarantine_corrupt: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("playerhomes.log".to_string()),
            },
        }
    }
}
