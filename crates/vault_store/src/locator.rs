//! Store locators.

use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies where a store keeps its data.
///
/// The locator is recorded in snapshot metadata (`database_url`) and decides
/// whether a raw file copy is part of backup and restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocator {
    /// An ephemeral in-memory store.
    Memory,
    /// A store persisted as a single file at the given path.
    File(PathBuf),
}

impl StoreLocator {
    /// Returns the path of the backing file, if the store is file-backed.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            StoreLocator::Memory => None,
            StoreLocator::File(path) => Some(path),
        }
    }

    /// Renders the locator as a URL-style string.
    pub fn as_url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StoreLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocator::Memory => write!(f, "memory://"),
            StoreLocator::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_locator_has_no_file() {
        let locator = StoreLocator::Memory;
        assert_eq!(locator.as_url(), "memory://");
        assert!(locator.file_path().is_none());
    }

    #[test]
    fn file_locator_exposes_path() {
        let locator = StoreLocator::File(PathBuf::from("/var/lib/vault/vault.db"));
        assert_eq!(locator.as_url(), "file:///var/lib/vault/vault.db");
        assert_eq!(
            locator.file_path(),
            Some(Path::new("/var/lib/vault/vault.db"))
        );
    }
}
