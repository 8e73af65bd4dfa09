//! The sync engine: recurring loop plus on-demand reconciliation.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::policy::{LastAppliedWins, ReconcilePolicy};
use crate::reconcile::{reconcile_collection, CollectionCounts};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vault_store::{EncryptedRecord, RecordStore, RecurringTask, User};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No pass in progress.
    Idle,
    /// A reconciliation pass is running.
    Syncing,
}

/// Statistics accumulated across reconciliation passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed passes (successful ones).
    pub cycles_completed: u64,
    /// Entities inserted into the remote store.
    pub entities_pushed: u64,
    /// Entities inserted into the local store.
    pub entities_pulled: u64,
    /// Shared ids whose divergent fields were converged.
    pub conflicts_converged: u64,
    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOutcome {
    /// Counters for the Users collection.
    pub users: CollectionCounts,
    /// Counters for the EncryptedRecords collection.
    pub records: CollectionCounts,
    /// True when no remote store is configured and the pass was a no-op.
    pub skipped: bool,
    /// Wall time spent in the pass.
    pub duration: Duration,
}

/// Reconciles a local store against an optional remote store.
///
/// With no remote configured every pass is a successful no-op. Otherwise a
/// pass reconciles Users and then EncryptedRecords (parents before children)
/// inside one transaction per store, committing local first and remote
/// second. A failure before the first commit rolls both sides back; there is
/// no atomic commit *across* stores, so a crash between the two commits can
/// leave them divergent until the next successful pass repairs it.
///
/// [`SyncEngine::start`] and [`SyncEngine::stop`] manage the recurring
/// background loop; [`SyncEngine::reconcile`] runs a single pass in the
/// caller's thread and is what the loop itself calls.
pub struct SyncEngine<P: ReconcilePolicy = LastAppliedWins> {
    local: Arc<dyn RecordStore>,
    remote: Option<Arc<dyn RecordStore>>,
    config: SyncConfig,
    policy: P,
    state: RwLock<EngineState>,
    stats: RwLock<SyncStats>,
    worker: Mutex<Option<RecurringTask>>,
}

impl SyncEngine<LastAppliedWins> {
    /// Creates an engine with the default last-applied-wins policy.
    pub fn new(
        local: Arc<dyn RecordStore>,
        remote: Option<Arc<dyn RecordStore>>,
        config: SyncConfig,
    ) -> Self {
        Self::with_policy(local, remote, config, LastAppliedWins)
    }
}

impl<P: ReconcilePolicy + 'static> SyncEngine<P> {
    /// Creates an engine with a custom conflict policy.
    pub fn with_policy(
        local: Arc<dyn RecordStore>,
        remote: Option<Arc<dyn RecordStore>>,
        config: SyncConfig,
        policy: P,
    ) -> Self {
        Self {
            local,
            remote,
            config,
            policy,
            state: RwLock::new(EngineState::Idle),
            stats: RwLock::new(SyncStats::default()),
            worker: Mutex::new(None),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Gets the accumulated stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true if the background loop is running.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Starts the recurring reconciliation loop.
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
            "sync-engine",
            self.config.interval,
            self.config.error_backoff,
            move || engine.reconcile().map(|_| ()),
        ));
    }

    /// Signals the loop to stop and blocks until the current pass finishes.
    pub fn stop(&self) {
        if let Some(task) = self.worker.lock().take() {
            task.stop();
        }
    }

    /// Performs exactly one reconciliation pass synchronously.
    ///
    /// Safe to call independently of the background loop; concurrent passes
    /// serialize on the store mutexes.
    ///
    /// # Errors
    ///
    /// Propagates connectivity, constraint, and commit failures unmodified.
    pub fn reconcile(&self) -> SyncResult<ReconcileOutcome> {
        let Some(remote) = self.remote.clone() else {
            return Ok(ReconcileOutcome {
                skipped: true,
                ..ReconcileOutcome::default()
            });
        };

        let started = Instant::now();
        *self.state.write() = EngineState::Syncing;
        let result = self.run_pass(remote.as_ref());
        *self.state.write() = EngineState::Idle;

        match result {
            Ok((users, records)) => {
                let outcome = ReconcileOutcome {
                    users,
                    records,
                    skipped: false,
                    duration: started.elapsed(),
                };
                let mut stats = self.stats.write();
                stats.cycles_completed += 1;
                stats.entities_pushed += users.pushed + records.pushed;
                stats.entities_pulled += users.pulled + records.pulled;
                stats.conflicts_converged += users.converged + records.converged;
                stats.last_error = None;
                tracing::info!(
                    users = users.total(),
                    records = records.total(),
                    elapsed_ms = outcome.duration.as_millis() as u64,
                    "reconciliation pass completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.stats.write().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn run_pass(
        &self,
        remote: &dyn RecordStore,
    ) -> SyncResult<(CollectionCounts, CollectionCounts)> {
        let mut local_tx = self.local.begin()?;
        let mut remote_tx = remote.begin()?;

        // Users before records, so freshly pulled records always find
        // their owner.
        let users =
            reconcile_collection::<User, _>(local_tx.as_mut(), remote_tx.as_mut(), &self.policy)?;
        let records = reconcile_collection::<EncryptedRecord, _>(
            local_tx.as_mut(),
            remote_tx.as_mut(),
            &self.policy,
        )?;

        // Local commits first. If it fails, the still-open remote
        // transaction rolls back on drop and neither side changes. A remote
        // commit failure after this point cannot undo the local commit.
        local_tx.commit()?;
        remote_tx.commit()?;

        Ok((users, records))
    }
}
