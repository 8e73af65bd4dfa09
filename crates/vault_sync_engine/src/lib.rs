//! # Vault Sync Engine
//!
//! Replication engine for the vaultd core: periodically reconciles the
//! `Users` and `EncryptedRecords` collections between a local store and an
//! optional remote store.
//!
//! This crate provides:
//! - A generic id-keyed reconciliation routine ([`reconcile_collection`])
//! - A replaceable conflict policy ([`ReconcilePolicy`], [`LastAppliedWins`])
//! - The [`SyncEngine`] with start/stop background loop and on-demand
//!   [`SyncEngine::reconcile`]
//!
//! ## Architecture
//!
//! One reconciliation pass runs **push then pull** per collection, Users
//! before EncryptedRecords:
//! 1. Push: entities present only in local are inserted into remote; shared
//!    ids get remote's mutable fields overwritten with local's values
//! 2. Pull: entities present only in remote are inserted into local; shared
//!    ids are resolved through the conflict policy, whose pick is the last
//!    value applied to either store
//!
//! Under the default [`LastAppliedWins`] policy both stores converge to the
//! **pre-cycle remote value** for every differing mutable field. There is no
//! timestamp or version comparison.
//!
//! ## Key Invariants
//!
//! - Entities match by id alone; ids are assumed stable across stores
//! - Users are fully reconciled before records, so foreign keys stay valid
//! - Each store commits once per pass; a failed commit rolls back everything
//!   not yet committed (there is no cross-store atomic commit)
//! - The background loop never terminates on error; it logs, backs off, and
//!   retries

mod config;
mod engine;
mod error;
mod policy;
mod reconcile;

pub use config::SyncConfig;
pub use engine::{EngineState, ReconcileOutcome, SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use policy::{LastAppliedWins, ReconcilePolicy};
pub use reconcile::{reconcile_collection, CollectionCounts, Replicated};
