//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for the recurring reconciliation loop.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pause between successful reconciliation cycles.
    pub interval: Duration,
    /// Pause after a failed cycle, before the loop continues.
    pub error_backoff: Duration,
}

impl SyncConfig {
    /// Creates a configuration with the given cycle interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            error_backoff: Duration::from_secs(60),
        }
    }

    /// Sets the backoff after a failed cycle.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
