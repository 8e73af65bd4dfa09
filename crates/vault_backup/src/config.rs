//! Configuration for the backup engine.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for snapshot creation and the recurring backup loop.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Directory that holds the snapshot subdirectories.
    pub root: PathBuf,
    /// Pause between successful backup cycles.
    pub interval: Duration,
    /// Pause after a failed cycle, before the loop continues.
    pub error_backoff: Duration,
}

impl BackupConfig {
    /// Creates a configuration with the given backup root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            interval: Duration::from_secs(3600),
            error_backoff: Duration::from_secs(60),
        }
    }

    /// Sets the pause between backup cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the backoff after a failed cycle.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::new("backups")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BackupConfig::default();
        assert_eq!(config.root, PathBuf::from("backups"));
        assert_eq!(config.interval, Duration::from_secs(3600));
        assert_eq!(config.error_backoff, Duration::from_secs(60));
    }
}
