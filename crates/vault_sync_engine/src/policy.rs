//! Replaceable conflict policies.

use crate::reconcile::Replicated;

/// Decides which side's mutable fields both stores converge to when an id is
/// present on both sides with differing values.
///
/// The policy only sees the two pre-cycle entities; it never inspects
/// timestamps or versions unless an implementation chooses to. The diff and
/// traversal logic in [`crate::reconcile_collection`] stays the same for
/// every policy, so strategies like timestamp-wins can be swapped in without
/// touching it.
pub trait ReconcilePolicy: Send + Sync {
    /// Picks the winning entity for a shared id.
    fn choose<'a, T: Replicated>(&self, local: &'a T, remote: &'a T) -> &'a T;
}

/// The compatibility policy: the side applied last wins.
///
/// The pull phase runs after the push phase, so the remote entity is the
/// last one applied - both stores converge to the pre-cycle remote value,
/// even though the push phase overwrote remote with local's values moments
/// earlier. No recency comparison is involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastAppliedWins;

impl ReconcilePolicy for LastAppliedWins {
    fn choose<'a, T: Replicated>(&self, _local: &'a T, remote: &'a T) -> &'a T {
        remote
    }
}
