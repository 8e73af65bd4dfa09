//! Record store capability consumed by the sync and backup engines.

use crate::entity::{EncryptedRecord, User};
use crate::error::{StoreError, StoreResult};
use crate::locator::StoreLocator;
use std::collections::BTreeMap;

/// A handle to a vault datastore.
///
/// Implementations must be safe to share behind an `Arc` across the sync and
/// backup engines.
///
/// # Coordination
///
/// `begin` acquires a store-wide mutex that is held until the returned
/// transaction commits or is dropped. Everything an engine does against a
/// store happens inside one transaction, so a backup export and a sync pass
/// over the same store never interleave their reads and writes.
pub trait RecordStore: Send + Sync {
    /// Returns the locator of this store.
    fn locator(&self) -> &StoreLocator;

    /// Starts a transaction, blocking until the store mutex is available.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connectivity`] if the store is unreachable.
    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction + '_>>;
}

/// A staged view of a store.
///
/// Writes mutate the staged copy only. `commit` publishes the staged state
/// atomically; dropping the transaction without committing discards it.
/// Constraints (unique username/email, record ownership, children before
/// parents) are checked against the staged view at write time.
pub trait StoreTransaction: std::fmt::Debug {
    /// Returns all users, ordered by id.
    fn users(&self) -> Vec<User>;

    /// Returns all encrypted records, ordered by id.
    fn records(&self) -> Vec<EncryptedRecord>;

    /// Returns the records owned by the given user, ordered by id.
    fn records_for_owner(&self, user_id: i64) -> Vec<EncryptedRecord>;

    /// Looks up a single user by id.
    fn user(&self, id: i64) -> Option<User>;

    /// Looks up a single record by id.
    fn record(&self, id: i64) -> Option<EncryptedRecord>;

    /// Inserts a new user.
    fn insert_user(&mut self, user: &User) -> StoreResult<()>;

    /// Overwrites an existing user.
    fn update_user(&mut self, user: &User) -> StoreResult<()>;

    /// Deletes a user. Fails while the user still owns records.
    fn delete_user(&mut self, id: i64) -> StoreResult<()>;

    /// Inserts a new record. The owner must already exist.
    fn insert_record(&mut self, record: &EncryptedRecord) -> StoreResult<()>;

    /// Overwrites an existing record.
    fn update_record(&mut self, record: &EncryptedRecord) -> StoreResult<()>;

    /// Deletes a record.
    fn delete_record(&mut self, id: i64) -> StoreResult<()>;

    /// Deletes every record.
    fn delete_all_records(&mut self);

    /// Deletes every user. Fails while any records remain.
    fn delete_all_users(&mut self) -> StoreResult<()>;

    /// Commits the staged state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Commit`] if the staged state could not be
    /// published; the store keeps its pre-transaction state.
    fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards the staged state. Equivalent to dropping the transaction.
    fn rollback(self: Box<Self>) {}
}

/// The staged collections shared by the store implementations.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreData {
    pub(crate) users: BTreeMap<i64, User>,
    pub(crate) records: BTreeMap<i64, EncryptedRecord>,
}

impl StoreData {
    pub(crate) fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        if self.users.contains_key(&user.id) {
            return Err(StoreError::constraint(format!(
                "user id {} already exists",
                user.id
            )));
        }
        self.check_user_uniqueness(user)?;
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    pub(crate) fn update_user(&mut self, user: &User) -> StoreResult<()> {
        if !self.users.contains_key(&user.id) {
            return Err(StoreError::NotFound {
                kind: "user",
                id: user.id,
            });
        }
        self.check_user_uniqueness(user)?;
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    pub(crate) fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        if self.records.values().any(|r| r.user_id == id) {
            return Err(StoreError::constraint(format!(
                "user {id} still owns records"
            )));
        }
        self.users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind: "user", id })
    }

    pub(crate) fn insert_record(&mut self, record: &EncryptedRecord) -> StoreResult<()> {
        if self.records.contains_key(&record.id) {
            return Err(StoreError::constraint(format!(
                "record id {} already exists",
                record.id
            )));
        }
        if !self.users.contains_key(&record.user_id) {
            return Err(StoreError::constraint(format!(
                "record {} references missing user {}",
                record.id, record.user_id
            )));
        }
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    pub(crate) fn update_record(&mut self, record: &EncryptedRecord) -> StoreResult<()> {
        if !self.records.contains_key(&record.id) {
            return Err(StoreError::NotFound {
                kind: "record",
                id: record.id,
            });
        }
        if !self.users.contains_key(&record.user_id) {
            return Err(StoreError::constraint(format!(
                "record {} references missing user {}",
                record.id, record.user_id
            )));
        }
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    pub(crate) fn delete_record(&mut self, id: i64) -> StoreResult<()> {
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind: "record", id })
    }

    pub(crate) fn delete_all_users(&mut self) -> StoreResult<()> {
        if !self.records.is_empty() {
            return Err(StoreError::constraint(
                "cannot delete users while records remain",
            ));
        }
        self.users.clear();
        Ok(())
    }

    fn check_user_uniqueness(&self, user: &User) -> StoreResult<()> {
        for other in self.users.values() {
            if other.id == user.id {
                continue;
            }
            if other.username == user.username {
                return Err(StoreError::constraint(format!(
                    "username {:?} already taken",
                    user.username
                )));
            }
            if other.email == user.email {
                return Err(StoreError::constraint(format!(
                    "email {:?} already taken",
                    user.email
                )));
            }
        }
        Ok(())
    }
}
