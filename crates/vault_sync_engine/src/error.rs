//! Error types for the sync engine.

use thiserror::Error;
use vault_store::StoreError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A store operation failed on either side.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Returns true if the failure was an unreachable store.
    pub fn is_connectivity(&self) -> bool {
        match self {
            SyncError::Store(e) => e.is_connectivity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_is_detected() {
        let err = SyncError::from(StoreError::connectivity("memory://", "offline"));
        assert!(err.is_connectivity());

        let err = SyncError::from(StoreError::commit_failed("boom"));
        assert!(!err.is_connectivity());
    }
}
