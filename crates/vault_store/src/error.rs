//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (remote store offline, file locked away).
    #[error("store unreachable: {locator}: {message}")]
    Connectivity {
        /// Locator of the unreachable store.
        locator: String,
        /// Description of the failure.
        message: String,
    },

    /// A transaction commit failed.
    #[error("commit failed: {message}")]
    Commit {
        /// Description of the failure.
        message: String,
    },

    /// A write violated a store constraint.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Description of the violated constraint.
        message: String,
    },

    /// An update or delete referenced an entity that does not exist.
    #[error("{kind} not found: id {id}")]
    NotFound {
        /// Entity kind ("user" or "record").
        kind: &'static str,
        /// The id that was not found.
        id: i64,
    },

    /// The persisted store document could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Creates a connectivity error.
    pub fn connectivity(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Creates a commit failure error.
    pub fn commit_failed(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
        }
    }

    /// Creates a constraint violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates an unreachable store.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity { .. })
    }
}
