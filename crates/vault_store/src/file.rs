//! File-backed record store persisted as a single JSON document.

use crate::entity::{EncryptedRecord, User};
use crate::error::{StoreError, StoreResult};
use crate::locator::StoreLocator;
use crate::store::{RecordStore, StoreData, StoreTransaction};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk shape of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    users: Vec<User>,
    encrypted_data: Vec<EncryptedRecord>,
}

impl StoreDocument {
    fn from_data(data: &StoreData) -> Self {
        Self {
            users: data.users.values().cloned().collect(),
            encrypted_data: data.records.values().cloned().collect(),
        }
    }

    fn into_data(self) -> StoreData {
        let mut data = StoreData::default();
        for user in self.users {
            data.users.insert(user.id, user);
        }
        for record in self.encrypted_data {
            data.records.insert(record.id, record);
        }
        data
    }
}

/// A record store persisted as a single file.
///
/// The whole store is held in memory and rewritten on every commit: the
/// staged state is serialized to a temporary file and renamed over the live
/// file, so a crash mid-commit never leaves a half-written store.
///
/// Because the store is file-backed, backups include a verbatim copy of the
/// store file and restores may copy one back; [`FileStore::reload`] re-reads
/// the file after such an external replacement.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    locator: StoreLocator,
    inner: Mutex<StoreData>,
}

impl FileStore {
    /// Opens or creates a file store at the given path.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if an existing file cannot be
    /// parsed, or an I/O error if it cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let data = load_document(&path)?;
        Ok(Self {
            locator: StoreLocator::File(path.clone()),
            path,
            inner: Mutex::new(data),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the backing file, replacing the cached state.
    ///
    /// Called after the file has been replaced externally, e.g. by the
    /// raw-copy step of a restore.
    pub fn reload(&self) -> StoreResult<()> {
        let data = load_document(&self.path)?;
        *self.inner.lock() = data;
        Ok(())
    }
}

fn load_document(path: &Path) -> StoreResult<StoreData> {
    if !path.exists() {
        return Ok(StoreData::default());
    }
    let bytes = fs::read(path)?;
    let document: StoreDocument = serde_json::from_slice(&bytes)?;
    Ok(document.into_data())
}

fn persist_document(path: &Path, data: &StoreData) -> StoreResult<()> {
    let document = StoreDocument::from_data(data);
    let bytes = serde_json::to_vec_pretty(&document)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path).map_err(|e| {
        StoreError::commit_failed(format!("renaming {} failed: {e}", tmp.display()))
    })?;
    Ok(())
}

impl RecordStore for FileStore {
    fn locator(&self) -> &StoreLocator {
        &self.locator
    }

    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        let guard = self.inner.lock();
        let staged = guard.clone();
        Ok(Box::new(FileTransaction {
            staged,
            guard,
            path: &self.path,
        }))
    }
}

#[derive(Debug)]
struct FileTransaction<'a> {
    staged: StoreData,
    guard: MutexGuard<'a, StoreData>,
    path: &'a Path,
}

impl StoreTransaction for FileTransaction<'_> {
    fn users(&self) -> Vec<User> {
        self.staged.users.values().cloned().collect()
    }

    fn records(&self) -> Vec<EncryptedRecord> {
        self.staged.records.values().cloned().collect()
    }

    fn records_for_owner(&self, user_id: i64) -> Vec<EncryptedRecord> {
        self.staged
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    fn user(&self, id: i64) -> Option<User> {
        self.staged.users.get(&id).cloned()
    }

    fn record(&self, id: i64) -> Option<EncryptedRecord> {
        self.staged.records.get(&id).cloned()
    }

    fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        self.staged.insert_user(user)
    }

    fn update_user(&mut self, user: &User) -> StoreResult<()> {
        self.staged.update_user(user)
    }

    fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        self.staged.delete_user(id)
    }

    fn insert_record(&mut self, record: &EncryptedRecord) -> StoreResult<()> {
        self.staged.insert_record(record)
    }

    fn update_record(&mut self, record: &EncryptedRecord) -> StoreResult<()> {
        self.staged.update_record(record)
    }

    fn delete_record(&mut self, id: i64) -> StoreResult<()> {
        self.staged.delete_record(id)
    }

    fn delete_all_records(&mut self) {
        self.staged.records.clear();
    }

    fn delete_all_users(&mut self) -> StoreResult<()> {
        self.staged.delete_all_users()
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self {
            staged,
            mut guard,
            path,
        } = *self;
        // Durable first, then visible: the cached state only changes once
        // the file rename has succeeded.
        persist_document(path, &staged)?;
        *guard = staged;
        Ok(())
    }
}
