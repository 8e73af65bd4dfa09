//! The backup engine: snapshot creation, restore, listing, deletion.

use crate::config::BackupConfig;
use crate::error::{BackupError, BackupResult};
use crate::snapshot::{
    self, BackupInfo, ItemCounts, RecordDoc, SnapshotMetadata, UserDoc, DB_FILE, METADATA_FILE,
    RECORDS_FILE, USERS_FILE,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vault_store::{Clock, RecordStore, RecurringTask, SystemClock};

/// Creates, restores, lists, and deletes snapshots of a vault store.
///
/// All on-demand operations run synchronously in the caller's thread and
/// propagate errors unmodified. [`BackupEngine::start`] additionally runs
/// [`BackupEngine::create_backup`] on a fixed interval in the background;
/// loop failures are logged and followed by the configured backoff.
///
/// Everything that reads or writes the store happens inside one store
/// transaction, so a snapshot never captures a half-applied sync pass.
pub struct BackupEngine {
    store: Arc<dyn RecordStore>,
    config: BackupConfig,
    clock: Arc<dyn Clock>,
    worker: Mutex<Option<RecurringTask>>,
}

impl BackupEngine {
    /// Creates a backup engine using the system clock.
    pub fn new(store: Arc<dyn RecordStore>, config: BackupConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a backup engine with an injected clock. For tests.
    pub fn with_clock(
        store: Arc<dyn RecordStore>,
        config: BackupConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            config,
            clock,
            worker: Mutex::new(None),
        }
    }

    /// Returns true if the background loop is running.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Starts the recurring backup loop.
    ///
    /// Idempotent: calling `start` while the loop is already running is a
    /// no-op.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let engine = Arc::clone(self);
        *worker = Some(RecurringTask::spawn(
            "backup-engine",
            self.config.interval,
            self.config.error_backoff,
            move || engine.create_backup().map(|_| ()),
        ));
    }

    /// Signals the loop to stop and blocks until the current cycle finishes.
    pub fn stop(&self) {
        if let Some(task) = self.worker.lock().take() {
            task.stop();
        }
    }

    /// Creates a new immutable snapshot and returns its directory.
    ///
    /// The directory is named after the current wall-clock second; if that
    /// name is already taken the timestamp is advanced until a free one is
    /// found, so back-to-back snapshots never collide or overwrite.
    ///
    /// # Errors
    ///
    /// Propagates store, serialization, and I/O failures. A failed attempt
    /// may leave a partial snapshot directory behind; it is never listed
    /// because `metadata.json` is written last.
    pub fn create_backup(&self) -> BackupResult<PathBuf> {
        fs::create_dir_all(&self.config.root)?;

        let mut stamp = self.clock.now_utc();
        let path = loop {
            let candidate = self.config.root.join(snapshot::dir_name(stamp));
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Same-second snapshot: take the next free second.
                    stamp += chrono::Duration::seconds(1);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let (users, records) = {
            let tx = self.store.begin()?;

            // Raw copy under the store mutex, so the file matches the
            // exported documents.
            if let Some(db) = self.store.locator().file_path() {
                if db.exists() {
                    fs::copy(db, path.join(DB_FILE))?;
                }
            }

            let users: Vec<UserDoc> = tx.users().iter().map(UserDoc::from).collect();
            let records: Vec<RecordDoc> = tx.records().iter().map(RecordDoc::from).collect();
            (users, records)
        };

        write_json(&path.join(USERS_FILE), &users)?;
        write_json(&path.join(RECORDS_FILE), &records)?;

        let metadata = SnapshotMetadata {
            timestamp: snapshot::timestamp_string(stamp),
            database_url: self.store.locator().as_url(),
            backup_type: "full".into(),
            items: ItemCounts {
                users: users.len(),
                encrypted_data: records.len(),
            },
        };
        write_json(&path.join(METADATA_FILE), &metadata)?;

        tracing::info!(
            path = %path.display(),
            users = metadata.items.users,
            records = metadata.items.encrypted_data,
            "snapshot created"
        );
        Ok(path)
    }

    /// Replaces the store's full contents with a snapshot.
    ///
    /// Validates the path and parses both documents before touching any
    /// state. The store mutation is one transaction: delete all records,
    /// delete all users, insert users, insert records, commit. A failure at
    /// any of those steps rolls the whole transaction back.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Validation`] for a missing path and
    /// [`BackupError::Serialization`] for malformed documents, in both
    /// cases without mutating the store.
    pub fn restore_backup(&self, path: impl AsRef<Path>) -> BackupResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BackupError::validation(path));
        }

        // Parse before any mutation.
        let users: Vec<UserDoc> = read_json_or_default(&path.join(USERS_FILE))?;
        let records: Vec<RecordDoc> = read_json_or_default(&path.join(RECORDS_FILE))?;

        let mut tx = self.store.begin()?;

        // Raw copy back under the store mutex; the commit below rewrites
        // the live file from the restored documents anyway.
        if let Some(db) = self.store.locator().file_path() {
            let snapshot_db = path.join(DB_FILE);
            if snapshot_db.exists() {
                fs::copy(&snapshot_db, db)?;
            }
        }

        // Children before parents, then parents before children.
        tx.delete_all_records();
        tx.delete_all_users()?;
        for user in users {
            tx.insert_user(&user.into_user())?;
        }
        for record in records {
            tx.insert_record(&record.into_record())?;
        }
        tx.commit()?;

        tracing::info!(path = %path.display(), "snapshot restored");
        Ok(())
    }

    /// Lists all snapshots under the backup root, most recent first.
    ///
    /// Only subdirectories containing a `metadata.json` count as snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Serialization`] if a metadata document is
    /// malformed.
    pub fn list_backups(&self) -> BackupResult<Vec<BackupInfo>> {
        let mut backups = Vec::new();
        if !self.config.root.exists() {
            return Ok(backups);
        }

        for entry in fs::read_dir(&self.config.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let metadata_path = path.join(METADATA_FILE);
            if !metadata_path.exists() {
                continue;
            }
            let metadata: SnapshotMetadata = read_json(&metadata_path)?;
            backups.push(BackupInfo {
                path,
                timestamp: metadata.timestamp,
                items: metadata.items,
            });
        }

        // The compact timestamp sorts lexicographically in time order.
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Deletes a snapshot directory. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Validation`] if the path does not exist.
    pub fn delete_backup(&self, path: impl AsRef<Path>) -> BackupResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BackupError::validation(path));
        }
        fs::remove_dir_all(path)?;
        tracing::info!(path = %path.display(), "snapshot deleted");
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> BackupResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> BackupResult<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> BackupResult<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path)
}
