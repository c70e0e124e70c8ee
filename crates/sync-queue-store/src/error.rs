//! Store error types.

use thiserror::Error;

/// Item store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// A mutex guarding the store was poisoned by a panicking holder
    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    /// Stable snake_case kind, used in structured error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Sqlite(_) => "sqlite",
            StoreError::Io(_) => "io",
            StoreError::Migration(_) => "migration",
            StoreError::Poisoned(_) => "poisoned",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned(err.to_string())
    }
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
