//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use sync_codec::DEFAULT_CODEC;
pub use sync_queue::DEFAULT_CHECKOUT_SIZE;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default wall-clock budget for acquiring a contested buffer.
pub const DEFAULT_CHECKOUT_BUDGET_MS: u64 = 5_000;

/// Default pause between contested checkout attempts.
pub const DEFAULT_CHECKOUT_BACKOFF_MS: u64 = 2_000;

/// Default wait for the whole-queue lock during consistency checks.
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;

/// Default lifetime of a whole-queue lock.
pub const DEFAULT_LOCK_TTL_SECS: u64 = sync_queue::DEFAULT_LOCK_TTL.as_secs();

/// Queue tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// SQLite file holding every queue. Defaults to `<base_dir>/sync-queue.sqlite`.
    pub database_path: Option<PathBuf>,
    /// Items per checkout when the caller does not ask for a size.
    pub checkout_size: usize,
    pub checkout_budget_ms: u64,
    pub checkout_backoff_ms: u64,
    pub lock_timeout_secs: u64,
    pub lock_ttl_secs: u64,
    /// Codec name used when a checkout asks for encoding.
    pub codec: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            database_path: None,
            checkout_size: DEFAULT_CHECKOUT_SIZE,
            checkout_budget_ms: DEFAULT_CHECKOUT_BUDGET_MS,
            checkout_backoff_ms: DEFAULT_CHECKOUT_BACKOFF_MS,
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
            lock_ttl_secs: DEFAULT_LOCK_TTL_SECS,
            codec: DEFAULT_CODEC.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `<base_dir>/config.json`, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Write this config to `<base_dir>/config.json`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from `SYNC_QUEUE_*` environment variables.
    fn load_from_env(&mut self) -> CoreResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<()> {
        if let Some(log_level) = lookup("SYNC_QUEUE_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(database) = lookup("SYNC_QUEUE_DATABASE") {
            self.database_path = Some(PathBuf::from(database));
        }
        if let Some(size) = lookup("SYNC_QUEUE_CHECKOUT_SIZE") {
            self.checkout_size = size.trim().parse().map_err(|_| {
                CoreError::Config(format!("SYNC_QUEUE_CHECKOUT_SIZE is not a number: {size:?}"))
            })?;
        }
        Ok(())
    }

    /// Reject values the queue cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.checkout_size == 0 {
            return Err(CoreError::Config(
                "checkout_size must be at least 1".to_string(),
            ));
        }
        if self.codec.trim().is_empty() {
            return Err(CoreError::Config("codec must not be empty".to_string()));
        }
        Ok(())
    }

    /// The database file, resolved against `paths` when not configured.
    pub fn database_file(&self, paths: &Paths) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }

    pub fn checkout_budget(&self) -> Duration {
        Duration::from_millis(self.checkout_budget_ms)
    }

    pub fn checkout_backoff(&self) -> Duration {
        Duration::from_millis(self.checkout_backoff_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}
