//! In-memory record store for testing.

use crate::entity::{EncryptedRecord, User};
use crate::error::{StoreError, StoreResult};
use crate::locator::StoreLocator;
use crate::store::{RecordStore, StoreData, StoreTransaction};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory record store.
///
/// Suitable for unit tests, integration tests, and as a stand-in for a
/// remote store. Includes fault-injection hooks so dependent crates can
/// exercise connectivity and commit failures:
///
/// - [`MemoryStore::set_reachable`] makes `begin` fail with a connectivity
///   error, simulating an unreachable remote
/// - [`MemoryStore::fail_next_commit`] makes the next commit fail, leaving
///   the store state untouched
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<StoreData>,
    locator: StoreLocator,
    reachable: AtomicBool,
    fail_next_commit: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreData::default()),
            locator: StoreLocator::Memory,
            reachable: AtomicBool::new(true),
            fail_next_commit: AtomicBool::new(false),
        }
    }

    /// Marks the store reachable or unreachable.
    ///
    /// While unreachable, `begin` fails with [`StoreError::Connectivity`].
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes the next commit fail with [`StoreError::Commit`].
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Inserts users and records directly, bypassing a caller transaction.
    ///
    /// Test convenience for building fixtures.
    pub fn seed(&self, users: &[User], records: &[EncryptedRecord]) -> StoreResult<()> {
        let mut tx = self.begin()?;
        for user in users {
            tx.insert_user(user)?;
        }
        for record in records {
            tx.insert_record(record)?;
        }
        tx.commit()
    }
}

impl RecordStore for MemoryStore {
    fn locator(&self) -> &StoreLocator {
        &self.locator
    }

    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(StoreError::connectivity(
                self.locator.as_url(),
                "store marked unreachable",
            ));
        }
        let guard = self.inner.lock();
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction {
            staged,
            guard,
            fail_next_commit: &self.fail_next_commit,
        }))
    }
}

#[derive(Debug)]
struct MemoryTransaction<'a> {
    staged: StoreData,
    guard: MutexGuard<'a, StoreData>,
    fail_next_commit: &'a AtomicBool,
}

impl StoreTransaction for MemoryTransaction<'_> {
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
            fail_next_commit,
        } = *self;
        if fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::commit_failed("injected commit failure"));
        }
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_user(id: i64) -> User {
        User {
            id,
            username: format!("user{id}"),
            password_hash: "hash".into(),
            email: format!("user{id}@example.com"),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            is_admin: false,
        }
    }

    fn make_record(id: i64, user_id: i64) -> EncryptedRecord {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        EncryptedRecord {
            id,
            user_id,
            data_type: "note".into(),
            encrypted_content: format!("cipher-{id}"),
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn commit_publishes_staged_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.insert_user(&make_user(1)).unwrap();
        tx.insert_record(&make_record(10, 1)).unwrap();
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        assert_eq!(tx.users().len(), 1);
        assert_eq!(tx.records().len(), 1);
        assert_eq!(tx.user(1).unwrap().username, "user1");
    }

    #[test]
    fn drop_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().unwrap();
            tx.insert_user(&make_user(1)).unwrap();
            // dropped without commit
        }
        let tx = store.begin().unwrap();
        assert!(tx.users().is_empty());
    }

    #[test]
    fn injected_commit_failure_leaves_store_untouched() {
        let store = MemoryStore::new();
        store.seed(&[make_user(1)], &[]).unwrap();

        store.fail_next_commit();
        let mut tx = store.begin().unwrap();
        tx.insert_user(&make_user(2)).unwrap();
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, StoreError::Commit { .. }));

        let tx = store.begin().unwrap();
        assert_eq!(tx.users().len(), 1);
    }

    #[test]
    fn unreachable_store_fails_begin() {
        let store = MemoryStore::new();
        store.set_reachable(false);
        assert!(store.begin().unwrap_err().is_connectivity());

        store.set_reachable(true);
        assert!(store.begin().is_ok());
    }

    #[test]
    fn username_and_email_must_be_unique() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.insert_user(&make_user(1)).unwrap();

        let mut dup = make_user(2);
        dup.username = "user1".into();
        assert!(matches!(
            tx.insert_user(&dup),
            Err(StoreError::Constraint { .. })
        ));

        let mut dup = make_user(2);
        dup.email = "user1@example.com".into();
        assert!(matches!(
            tx.insert_user(&dup),
            Err(StoreError::Constraint { .. })
        ));
    }

    #[test]
    fn record_requires_existing_owner() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.insert_record(&make_record(10, 99)),
            Err(StoreError::Constraint { .. })
        ));
    }

    #[test]
    fn user_with_records_cannot_be_deleted() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.insert_user(&make_user(1)).unwrap();
        tx.insert_record(&make_record(10, 1)).unwrap();

        assert!(tx.delete_user(1).is_err());
        assert!(tx.delete_all_users().is_err());

        tx.delete_all_records();
        tx.delete_all_users().unwrap();
        assert!(tx.users().is_empty());
    }

    #[test]
    fn owner_filtered_scan() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.insert_user(&make_user(1)).unwrap();
        tx.insert_user(&make_user(2)).unwrap();
        tx.insert_record(&make_record(10, 1)).unwrap();
        tx.insert_record(&make_record(11, 2)).unwrap();
        tx.insert_record(&make_record(12, 1)).unwrap();

        let owned = tx.records_for_owner(1);
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|r| r.user_id == 1));
    }
}
