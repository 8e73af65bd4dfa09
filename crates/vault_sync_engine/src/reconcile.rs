//! Generic id-keyed reconciliation of one entity collection.

use crate::error::SyncResult;
use crate::policy::ReconcilePolicy;
use std::collections::BTreeMap;
use vault_store::{EncryptedRecord, StoreResult, StoreTransaction, User};

/// An entity collection that can be reconciled between two stores.
///
/// Entities match by [`Replicated::id`] alone - ids are assumed stable and
/// identical in meaning across stores. [`Replicated::overwrite_from`] copies
/// the *mutable* fields only; per-side fields (creation time, admin flag,
/// ownership) are never touched by reconciliation.
pub trait Replicated: Clone + PartialEq + Send {
    /// Collection name, used in logs.
    const COLLECTION: &'static str;

    /// The stable entity id.
    fn id(&self) -> i64;

    /// Overwrites this entity's mutable fields with `source`'s values.
    fn overwrite_from(&mut self, source: &Self);

    /// Loads the full collection from a transaction.
    fn load(tx: &dyn StoreTransaction) -> Vec<Self>;

    /// Inserts a new entity through a transaction.
    fn insert(tx: &mut dyn StoreTransaction, item: &Self) -> StoreResult<()>;

    /// Overwrites an existing entity through a transaction.
    fn update(tx: &mut dyn StoreTransaction, item: &Self) -> StoreResult<()>;
}

impl Replicated for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> i64 {
        self.id
    }

    fn overwrite_from(&mut self, source: &Self) {
        self.username = source.username.clone();
        self.password_hash = source.password_hash.clone();
        self.email = source.email.clone();
    }

    fn load(tx: &dyn StoreTransaction) -> Vec<Self> {
        tx.users()
    }

    fn insert(tx: &mut dyn StoreTransaction, item: &Self) -> StoreResult<()> {
        tx.insert_user(item)
    }

    fn update(tx: &mut dyn StoreTransaction, item: &Self) -> StoreResult<()> {
        tx.update_user(item)
    }
}

impl Replicated for EncryptedRecord {
    const COLLECTION: &'static str = "encrypted_data";

    fn id(&self) -> i64 {
        self.id
    }

    fn overwrite_from(&mut self, source: &Self) {
        self.data_type = source.data_type.clone();
        self.encrypted_content = source.encrypted_content.clone();
        self.updated_at = source.updated_at;
    }

    fn load(tx: &dyn StoreTransaction) -> Vec<Self> {
        tx.records()
    }

    fn insert(tx: &mut dyn StoreTransaction, item: &Self) -> StoreResult<()> {
        tx.insert_record(item)
    }

    fn update(tx: &mut dyn StoreTransaction, item: &Self) -> StoreResult<()> {
        tx.update_record(item)
    }
}

/// Counters for one collection in one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    /// Entities inserted into the remote store (local-only ids).
    pub pushed: u64,
    /// Entities inserted into the local store (remote-only ids).
    pub pulled: u64,
    /// Shared ids whose mutable fields differed and were converged.
    pub converged: u64,
}

impl CollectionCounts {
    /// Total entities written during the pass.
    pub fn total(&self) -> u64 {
        self.pushed + self.pulled + self.converged
    }
}

/// Reconciles one collection between two open transactions.
///
/// Runs the push phase (local to remote) and then the pull phase (remote to
/// local). For ids present on both sides the `policy` picks the entity whose
/// mutable fields both stores converge to; because the pull phase runs last,
/// its pick is the last value applied on either side.
///
/// Writes are staged in the transactions; the caller commits.
///
/// # Errors
///
/// Any staged write failure (constraint violation, missing entity) aborts
/// the pass; nothing is committed here.
pub fn reconcile_collection<T, P>(
    local: &mut dyn StoreTransaction,
    remote: &mut dyn StoreTransaction,
    policy: &P,
) -> SyncResult<CollectionCounts>
where
    T: Replicated,
    P: ReconcilePolicy,
{
    let local_items: BTreeMap<i64, T> = T::load(local).into_iter().map(|t| (t.id(), t)).collect();
    let remote_items: BTreeMap<i64, T> = T::load(remote).into_iter().map(|t| (t.id(), t)).collect();

    let mut counts = CollectionCounts::default();

    // Push phase: local -> remote.
    for (id, local_item) in &local_items {
        match remote_items.get(id) {
            None => {
                T::insert(remote, local_item)?;
                counts.pushed += 1;
            }
            Some(remote_item) => {
                // Overwrite remote's mutable fields with local's values; the
                // pull phase below has the final say.
                let mut staged = remote_item.clone();
                staged.overwrite_from(local_item);
                T::update(remote, &staged)?;
            }
        }
    }

    // Pull phase: remote -> local.
    for (id, remote_item) in &remote_items {
        match local_items.get(id) {
            None => {
                T::insert(local, remote_item)?;
                counts.pulled += 1;
            }
            Some(local_item) => {
                let winner = policy.choose(local_item, remote_item);

                let mut merged_local = local_item.clone();
                merged_local.overwrite_from(winner);
                let mut merged_remote = remote_item.clone();
                merged_remote.overwrite_from(winner);

                if merged_local != *local_item || merged_remote != *remote_item {
                    counts.converged += 1;
                }

                T::update(local, &merged_local)?;
                T::update(remote, &merged_remote)?;
            }
        }
    }

    tracing::debug!(
        collection = T::COLLECTION,
        pushed = counts.pushed,
        pulled = counts.pulled,
        converged = counts.converged,
        "collection reconciled"
    );

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::LastAppliedWins;
    use chrono::{TimeZone, Utc};
    use vault_store::{MemoryStore, RecordStore};

    fn make_user(id: i64, email: &str) -> User {
        User {
            id,
            username: format!("user{id}"),
            password_hash: "hash".into(),
            email: email.into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            is_admin: false,
        }
    }

    #[test]
    fn one_sided_entities_are_copied_both_ways() {
        let local = MemoryStore::new();
        let remote = MemoryStore::new();
        local.seed(&[make_user(1, "a@x")], &[]).unwrap();
        remote.seed(&[make_user(2, "b@x")], &[]).unwrap();

        let mut ltx = local.begin().unwrap();
        let mut rtx = remote.begin().unwrap();
        let counts =
            reconcile_collection::<User, _>(ltx.as_mut(), rtx.as_mut(), &LastAppliedWins).unwrap();
        ltx.commit().unwrap();
        rtx.commit().unwrap();

        assert_eq!(counts.pushed, 1);
        assert_eq!(counts.pulled, 1);
        assert_eq!(counts.converged, 0);

        let ltx = local.begin().unwrap();
        let rtx = remote.begin().unwrap();
        assert_eq!(ltx.users().len(), 2);
        assert_eq!(rtx.users().len(), 2);
        assert_eq!(ltx.user(2).unwrap().email, "b@x");
        assert_eq!(rtx.user(1).unwrap().email, "a@x");
    }

    #[test]
    fn divergent_fields_converge_to_remote_value() {
        let local = MemoryStore::new();
        let remote = MemoryStore::new();
        local.seed(&[make_user(1, "a@x")], &[]).unwrap();
        remote.seed(&[make_user(1, "b@x")], &[]).unwrap();

        let mut ltx = local.begin().unwrap();
        let mut rtx = remote.begin().unwrap();
        let counts =
            reconcile_collection::<User, _>(ltx.as_mut(), rtx.as_mut(), &LastAppliedWins).unwrap();
        ltx.commit().unwrap();
        rtx.commit().unwrap();

        assert_eq!(counts.converged, 1);
        assert_eq!(local.begin().unwrap().user(1).unwrap().email, "b@x");
        assert_eq!(remote.begin().unwrap().user(1).unwrap().email, "b@x");
    }

    #[test]
    fn policy_is_replaceable() {
        struct LocalWins;
        impl ReconcilePolicy for LocalWins {
            fn choose<'a, T: Replicated>(&self, local: &'a T, _remote: &'a T) -> &'a T {
                local
            }
        }

        let local = MemoryStore::new();
        let remote = MemoryStore::new();
        local.seed(&[make_user(1, "a@x")], &[]).unwrap();
        remote.seed(&[make_user(1, "b@x")], &[]).unwrap();

        let mut ltx = local.begin().unwrap();
        let mut rtx = remote.begin().unwrap();
        reconcile_collection::<User, _>(ltx.as_mut(), rtx.as_mut(), &LocalWins).unwrap();
        ltx.commit().unwrap();
        rtx.commit().unwrap();

        assert_eq!(local.begin().unwrap().user(1).unwrap().email, "a@x");
        assert_eq!(remote.begin().unwrap().user(1).unwrap().email, "a@x");
    }

    #[test]
    fn immutable_fields_stay_per_side() {
        let mut local_user = make_user(1, "a@x");
        local_user.is_admin = true;
        let remote_user = make_user(1, "b@x");

        let local = MemoryStore::new();
        let remote = MemoryStore::new();
        local.seed(&[local_user], &[]).unwrap();
        remote.seed(&[remote_user], &[]).unwrap();

        let mut ltx = local.begin().unwrap();
        let mut rtx = remote.begin().unwrap();
        reconcile_collection::<User, _>(ltx.as_mut(), rtx.as_mut(), &LastAppliedWins).unwrap();
        ltx.commit().unwrap();
        rtx.commit().unwrap();

        // The admin flag is not a replicated field.
        assert!(local.begin().unwrap().user(1).unwrap().is_admin);
        assert!(!remote.begin().unwrap().user(1).unwrap().is_admin);
    }
}
