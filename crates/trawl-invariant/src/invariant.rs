//! The [`Invariant`] trait and its verdict types.

use trawl_types::ShardId;

use crate::entity::EntityRecord;
use crate::store::EntityStore;

/// Name of the history-integrity invariant collection. Enabled for
/// fixing by default.
pub const COLLECTION_HISTORY: &str = "history";
/// Name of the mutable-state-integrity invariant collection. Enabled
/// for fixing by default.
pub const COLLECTION_MUTABLE_STATE: &str = "mutable_state";
/// Name of the staleness invariant collection. Disabled for fixing by
/// default.
pub const COLLECTION_STALE: &str = "stale";

/// Verdict of checking one entity against one invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckVerdict {
    /// The entity satisfies the invariant.
    Healthy,
    /// The entity violates the invariant.
    Corrupt,
    /// The predicate could not run (dependency unavailable, malformed
    /// state).
    CheckFailed,
}

/// Result of checking one entity against one invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// The verdict.
    pub verdict: CheckVerdict,
    /// Detail for operators; empty for healthy entities.
    pub info: String,
}

impl CheckResult {
    /// A healthy verdict.
    pub fn healthy() -> Self {
        Self {
            verdict: CheckVerdict::Healthy,
            info: String::new(),
        }
    }

    /// A corrupt verdict with detail.
    pub fn corrupt(info: impl Into<String>) -> Self {
        Self {
            verdict: CheckVerdict::Corrupt,
            info: info.into(),
        }
    }

    /// A check-failed verdict with detail.
    pub fn check_failed(info: impl Into<String>) -> Self {
        Self {
            verdict: CheckVerdict::CheckFailed,
            info: info.into(),
        }
    }
}

/// Outcome of attempting to repair one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// A repair was applied.
    Fixed,
    /// No repair was needed (entity healthy, gone, or its invariant
    /// disabled).
    Skipped,
    /// A repair was attempted and failed, or the entity could not be
    /// read.
    Failed,
}

/// Result of attempting to repair one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixResult {
    /// The outcome.
    pub outcome: FixOutcome,
    /// Detail for operators.
    pub info: String,
}

impl FixResult {
    /// A fixed outcome with detail.
    pub fn fixed(info: impl Into<String>) -> Self {
        Self {
            outcome: FixOutcome::Fixed,
            info: info.into(),
        }
    }

    /// A skipped outcome with detail.
    pub fn skipped(info: impl Into<String>) -> Self {
        Self {
            outcome: FixOutcome::Skipped,
            info: info.into(),
        }
    }

    /// A failed outcome with detail.
    pub fn failed(info: impl Into<String>) -> Self {
        Self {
            outcome: FixOutcome::Failed,
            info: info.into(),
        }
    }
}

/// A named predicate over an entity, plus the repair for entities that
/// violate it.
///
/// Implementations must be deterministic for a given entity state:
/// the scanner and the fixer both evaluate them, possibly far apart in
/// time, and classification differences between the two runs are
/// expected only when the entity itself changed.
#[async_trait::async_trait]
pub trait Invariant: Send + Sync {
    /// Stable name, used in reports, aggregates, and enablement config.
    fn name(&self) -> &'static str;

    /// Check one entity.
    async fn check(&self, entity: &EntityRecord) -> CheckResult;

    /// Repair one entity previously classified corrupt by this
    /// invariant. Updates go through the store's versioned CAS path.
    async fn fix(
        &self,
        store: &dyn EntityStore,
        shard_id: ShardId,
        entity: &EntityRecord,
    ) -> FixResult;
}
