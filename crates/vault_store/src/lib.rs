//! # Vault Store
//!
//! Record store abstraction for the vaultd replication and backup core.
//!
//! This crate provides:
//! - The two vault entities: [`User`] and [`EncryptedRecord`]
//! - The [`RecordStore`] / [`StoreTransaction`] capability consumed by the
//!   sync and backup engines
//! - An in-memory store for testing and a JSON file-backed store
//! - Runtime support shared by both engines: an injectable [`Clock`] and the
//!   [`RecurringTask`] background scheduler
//!
//! ## Transaction model
//!
//! A transaction is a staged copy of the whole store. Writes mutate the
//! staged copy only; `commit` publishes it atomically, dropping the
//! transaction rolls it back. `begin` holds the store's single mutex for the
//! lifetime of the transaction, so two transactions on the same store never
//! interleave - a backup export and a sync pass serialize against each other.
//!
//! ## Key Invariants
//!
//! - Entity ids are caller-assigned and stable across stores
//! - Username and email are unique per store
//! - An `EncryptedRecord` always references an existing `User`
//! - Users cannot be deleted while they still own records

mod clock;
mod entity;
mod error;
mod file;
mod locator;
mod memory;
mod store;
mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::{EncryptedRecord, User};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use locator::StoreLocator;
pub use memory::MemoryStore;
pub use store::{RecordStore, StoreTransaction};
pub use task::RecurringTask;
