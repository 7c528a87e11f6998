//! Runtime configuration for store hosts (CLI, embedders).
//!
//! # Responsibility
//! - Resolve database path and logging settings from the environment.
//! - Open the configured database and start logging when requested.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Logging stays disabled unless a log directory is configured.

use crate::db::{open_db, DbResult};
use crate::logging::{default_log_level, init_logging};
use rusqlite::Connection;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TODO_STORE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "TODO_STORE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TODO_STORE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "todo_store.sqlite3";

/// Resolved store host settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Reads `TODO_STORE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = non_blank(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = non_blank(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        config.log_dir = non_blank(LOG_DIR_ENV).map(PathBuf::from);
        config
    }

    /// Opens (and migrates) the configured database file.
    pub fn open_db(&self) -> DbResult<Connection> {
        open_db(&self.db_path)
    }

    /// Starts file logging when a directory is configured.
    ///
    /// Returns `Ok(false)` when logging is disabled.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(dir) = self.log_dir.as_ref() else {
            return Ok(false);
        };
        let dir = dir
            .to_str()
            .ok_or_else(|| format!("log_dir `{}` is not valid UTF-8", dir.display()))?;
        init_logging(&self.log_level, dir)?;
        Ok(true)
    }
}
