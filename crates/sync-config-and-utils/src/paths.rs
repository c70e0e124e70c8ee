//! On-disk layout.
//!
//! ```text
//! <base>/config.json
//! <base>/sync-queue.sqlite
//! <base>/logs/sync-queue.jsonl
//! ```
//!
//! `<base>` is `~/.sync-queue` unless the caller supplies one.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

const DEFAULT_DIR: &str = ".sync-queue";
const CONFIG_NAME: &str = "config.json";
const DATABASE_NAME: &str = "sync-queue.sqlite";
const LOG_NAME: &str = "sync-queue.jsonl";

#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Layout under the current user's home directory.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("no home directory for this user".to_string()))?;
        Ok(Self::with_base_dir(home.join(DEFAULT_DIR)))
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join(CONFIG_NAME)
    }

    /// Used when the config names no database.
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join(DATABASE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_NAME)
    }

    /// Create the base and log directories if missing.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        for dir in [self.base_dir.clone(), self.logs_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_under_base() {
        let base = PathBuf::from("/var/lib/sync");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.database_file(), base.join("sync-queue.sqlite"));
        assert_eq!(paths.log_file(), base.join("logs").join("sync-queue.jsonl"));
    }

    #[test]
    fn ensure_dirs_creates_nested() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("a").join("b"));

        paths.ensure_dirs().unwrap();
        assert!(paths.logs_dir().is_dir());
        // Idempotent
        paths.ensure_dirs().unwrap();
    }
}
