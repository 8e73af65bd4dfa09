//! # Vault Backup
//!
//! Point-in-time snapshot engine for the vaultd core: exports the full
//! dataset into timestamped snapshot directories and restores from them.
//!
//! ## Snapshot layout
//!
//! ```text
//! <backup_root>/backup_<YYYYMMDD_HHMMSS>/
//!   database.db         (raw store file copy, file-backed stores only)
//!   users.json          (array of {id, username, password_hash, email, created_at})
//!   encrypted_data.json (array of {id, user_id, data_type, encrypted_content,
//!                        created_at, updated_at})
//!   metadata.json       ({timestamp, database_url, backup_type, items})
//! ```
//!
//! Timestamps inside the documents are ISO-8601 strings; JSON is
//! pretty-printed with two-space indent. Snapshots are immutable once
//! written and never silently overwritten: a second snapshot in the same
//! wall-clock second gets the next free timestamp.
//!
//! ## Key Invariants
//!
//! - `metadata.json` item counts equal the serialized collection lengths
//! - Restore deletes children before parents and inserts parents before
//!   children, in one transaction; a failed restore leaves the prior data
//! - `restore_backup` and `delete_backup` validate the path before touching
//!   anything

mod config;
mod engine;
mod error;
mod snapshot;

pub use config::BackupConfig;
pub use engine::BackupEngine;
pub use error::{BackupError, BackupResult};
pub use snapshot::{BackupInfo, ItemCounts, SnapshotMetadata};
