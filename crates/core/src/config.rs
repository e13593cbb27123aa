//! Settings management
//!
//! Settings live in `config.toml` under `$OSN_CONFIG_DIR`, falling back to
//! `<platform config dir>/osn`. A missing file yields defaults; a malformed one
//! is a configuration error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::error::{Error, Result};

/// Environment variable overriding the settings directory
pub const CONFIG_DIR_ENV: &str = "OSN_CONFIG_DIR";

/// Default lifetime of presigned URLs
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 3600;

/// Longest presigned URL lifetime most S3-compatible services accept (7 days)
pub const MAX_PRESIGN_TTL_SECS: u64 = 604_800;

/// Top-level settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Credentials file used when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    pub sync: SyncSettings,

    pub retry: RetryConfig,
}

/// How downloads fetch object bodies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStrategy {
    /// Authenticated `GetObject` through the object store
    #[default]
    Direct,
    /// Presign each key and fetch the URL over plain HTTP
    Presigned,
}

/// Sync engine tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub batch_size: usize,
    /// Items in flight at once within a batch; 1 means strictly sequential
    pub concurrency: usize,
    pub presign_ttl_secs: u64,
    pub download_strategy: DownloadStrategy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
            presign_ttl_secs: DEFAULT_PRESIGN_TTL_SECS,
            download_strategy: DownloadStrategy::Direct,
        }
    }
}

impl SyncSettings {
    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }
}

/// Retry policy for individual object transfers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

impl Config {
    /// Check value ranges the type system cannot express
    pub fn validate(&self) -> Result<()> {
        if self.sync.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than 0".into()));
        }
        if self.sync.concurrency == 0 {
            return Err(Error::Config("concurrency must be greater than 0".into()));
        }
        if self.sync.presign_ttl_secs == 0 || self.sync.presign_ttl_secs > MAX_PRESIGN_TTL_SECS {
            return Err(Error::Config(format!(
                "presign_ttl_secs must be between 1 and {MAX_PRESIGN_TTL_SECS}"
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Loads and saves the settings file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default location (`$OSN_CONFIG_DIR` or platform dir)
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Cannot determine config directory".into()))?
                .join("osn"),
        };
        Ok(Self::with_path(dir.join("config.toml")))
    }

    /// Manager for an explicit settings file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, returning defaults when the file does not exist
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No settings file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid settings file {}: {e}", self.path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write settings, creating the parent directory when needed
    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
