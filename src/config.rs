use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::Database;
use crate::storage::DEFAULT_KEY;

/// User settings, read from `config.toml` in the platform config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the application database lives. Defaults to the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    /// Slot name the collection is stored under
    pub storage_key: String,
    /// How long notifications stay on screen
    pub notification_secs: u64,
    /// `tracing` filter directive, overridden by `APPTRACK_LOG`
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            storage_key: DEFAULT_KEY.to_string(),
            notification_secs: 5,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "apptrack")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(Database::default_path)
    }

    pub fn notification_lifetime(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}
