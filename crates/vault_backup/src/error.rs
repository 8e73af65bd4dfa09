//! Error types for backup and restore.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vault_store::StoreError;

/// Result type for backup operations.
pub type BackupResult<T> = Result<T, BackupError>;

/// Errors that can occur during backup, restore, list, and delete.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The given snapshot path does not exist.
    #[error("backup path does not exist: {path}")]
    Validation {
        /// The rejected path.
        path: PathBuf,
    },

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A snapshot document could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while reading or writing snapshot files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BackupError {
    /// Creates a validation error for a missing snapshot path.
    pub fn validation(path: impl AsRef<Path>) -> Self {
        Self::Validation {
            path: path.as_ref().to_path_buf(),
        }
    }
}
