//! Archive configuration
//!
//! Loaded once at startup and handed to each component by reference.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::GulpError;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";
pub const DEFAULT_DB_PATH: &str = "storage/conversations.db";
pub const DEFAULT_CONVERSATIONS_FOLDER: &str = "AI Conversations";
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 30;

/// Environment override for the configuration file path
pub const CONFIG_PATH_ENV: &str = "GPT_GULP_CONFIG";
/// Environment override for `storage.db_path`
pub const DB_PATH_ENV: &str = "GPT_GULP_DB";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GulpConfig {
    /// Per-collector switches, keyed by platform name
    pub platforms: BTreeMap<String, PlatformConfig>,
    pub obsidian: ObsidianConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    /// Reserved; kept so a saved config round-trips
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub processing: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub enabled: bool,
    /// Directories to watch; empty means the platform defaults
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub watch_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObsidianConfig {
    pub vault_path: PathBuf,
    pub ai_conversations_folder: String,
    pub include_full_conversation: bool,
}

impl Default for ObsidianConfig {
    fn default() -> Self {
        Self {
            vault_path: PathBuf::new(),
            ai_conversations_folder: DEFAULT_CONVERSATIONS_FOLDER.to_string(),
            include_full_conversation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_minutes: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
        }
    }
}

impl SyncConfig {
    /// Sleep between sync ticks; never shorter than one minute
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl GulpConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. A file that exists but does not parse is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::load_file(path)?.with_env_overrides())
    }

    /// Load the file as written, without environment overrides. Use this
    /// when the result will be saved back.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: GulpConfig =
            serde_json::from_str(&contents).map_err(|source| GulpError::Config {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write configuration as pretty-printed JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(GulpError::Encode)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn platform_enabled(&self, platform: &str) -> bool {
        self.platforms
            .get(platform)
            .map(|p| p.enabled)
            .unwrap_or(false)
    }

    /// Where exported notes land: `vault_path/ai_conversations_folder`
    pub fn conversations_folder(&self) -> PathBuf {
        self.obsidian
            .vault_path
            .join(&self.obsidian.ai_conversations_folder)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            if !db_path.trim().is_empty() {
                self.storage.db_path = PathBuf::from(db_path);
            }
        }
        self
    }
}

/// Config path from the command line, then the environment, then the default
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
