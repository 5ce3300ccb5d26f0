//! Application configuration
//!
//! Read from `$CARLOG_CONFIG` or `<config dir>/carlog/config.toml`; a missing
//! file means defaults. `CARLOG_DATABASE` overrides the database path.

pub mod repository;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::services::reconcile::ReconcileOptions;

const CONFIG_ENV: &str = "CARLOG_CONFIG";
const DATABASE_ENV: &str = "CARLOG_DATABASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding the records
    pub database_path: PathBuf,
    /// Phrase used to pick the sheet to import
    pub target_sheet: String,
    /// Rows planned and dispatched per chunk
    pub import_batch_size: usize,
    /// Store operations in flight at once
    pub max_concurrent_rows: usize,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: default_database_path(),
            target_sheet: "car log".to_string(),
            import_batch_size: ReconcileOptions::DEFAULT_BATCH_SIZE,
            max_concurrent_rows: ReconcileOptions::DEFAULT_MAX_CONCURRENT,
            log_level: "info".to_string(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carlog")
        .join("carlog.db")
}

/// Config file location: `$CARLOG_CONFIG`, else the platform config dir
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carlog")
        .join("config.toml")
}

impl Config {
    /// Load from the default location with environment overrides applied
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        if let Ok(path) = std::env::var(DATABASE_ENV) {
            debug!("Database path overridden by {}", DATABASE_ENV);
            config.database_path = PathBuf::from(path);
        }
        Ok(config)
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Import settings for generating keys in `year`
    pub fn reconcile_options(&self, year: crate::records::KeyYear) -> ReconcileOptions {
        let mut options = ReconcileOptions::new(year);
        options.batch_size = self.import_batch_size.max(1);
        options.max_concurrent = self.max_concurrent_rows.max(1);
        options
    }
}
