//! Per-shard scan/fix reports and their running aggregates.
//!
//! One report is produced per shard per run. The `result` of a report is
//! a tagged union: either the shard failed outright
//! ([`ControlFlowFailure`]) or it was processed and carries blob
//! pointers for each classification bucket. Exactly one branch exists by
//! construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Keys, ShardId};

// ---------------------------------------------------------------------------
// Control-flow failure
// ---------------------------------------------------------------------------

/// A shard whose processing aborted before classification could
/// complete (cursor read error, blob write error, timeout).
///
/// Distinct from a shard whose entities were classified as corrupt: a
/// control-flow failure is a value inside the report, never a workflow
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowFailure {
    /// Human-readable description of what went wrong.
    pub info: String,
}

// ---------------------------------------------------------------------------
// Scan reports
// ---------------------------------------------------------------------------

/// Counters produced by scanning one shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Entities the cursor visited.
    pub entities_count: u64,
    /// Entities classified corrupt.
    pub corrupted_count: u64,
    /// Entities whose check could not run.
    pub check_failed_count: u64,
    /// Corruption counts keyed by the determining invariant's name.
    pub corruption_by_type: BTreeMap<String, u64>,
}

/// Blob pointers for the scan classification buckets. `None` means the
/// bucket stayed empty for this shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanKeys {
    /// Keys of entities classified corrupt.
    pub corrupt: Option<Keys>,
    /// Keys of entities whose check could not run.
    pub failed: Option<Keys>,
}

/// Outcome of scanning one shard: exactly one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanResult {
    /// The shard could not be processed at all.
    ControlFlowFailure(ControlFlowFailure),
    /// The shard was processed; pointers to its classified keys.
    ShardScanKeys(ScanKeys),
}

/// Report for one scanned shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// The shard this report covers.
    pub shard_id: ShardId,
    /// Counters observed before the scan ended (possibly partial on a
    /// control-flow failure).
    pub stats: ScanStats,
    /// What happened to the shard.
    pub result: ScanResult,
}

impl ScanReport {
    /// Whether the shard failed before classification completed.
    pub fn is_control_flow_failure(&self) -> bool {
        matches!(self.result, ScanResult::ControlFlowFailure(_))
    }

    /// The corrupt-keys pointer, when the shard produced one.
    pub fn corrupt_keys(&self) -> Option<&Keys> {
        match &self.result {
            ScanResult::ShardScanKeys(keys) => keys.corrupt.as_ref(),
            ScanResult::ControlFlowFailure(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fix reports
// ---------------------------------------------------------------------------

/// Counters produced by fixing one shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixStats {
    /// Keys the fixer re-examined.
    pub entities_count: u64,
    /// Repairs applied.
    pub fixed_count: u64,
    /// Entities no longer corrupt (or whose invariant is disabled).
    pub skipped_count: u64,
    /// Repairs attempted and failed, or entities that could not be read.
    pub failed_count: u64,
}

/// Blob pointers for the fix classification buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixKeys {
    /// Keys of repaired entities.
    pub fixed: Option<Keys>,
    /// Keys of entities that needed no repair.
    pub skipped: Option<Keys>,
    /// Keys of entities whose repair failed.
    pub failed: Option<Keys>,
}

/// Outcome of fixing one shard: exactly one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixResult {
    /// The shard could not be processed at all.
    ControlFlowFailure(ControlFlowFailure),
    /// The shard was processed; pointers to its classified keys.
    ShardFixKeys(FixKeys),
}

/// Report for one fixed shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixReport {
    /// The shard this report covers.
    pub shard_id: ShardId,
    /// Counters observed before the fix ended (possibly partial on a
    /// control-flow failure).
    pub stats: FixStats,
    /// What happened to the shard.
    pub result: FixResult,
}

impl FixReport {
    /// Whether the shard failed before classification completed.
    pub fn is_control_flow_failure(&self) -> bool {
        matches!(self.result, FixResult::ControlFlowFailure(_))
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Running totals across all completed scan shards.
///
/// Counts only grow, and merging is commutative, so reports can be
/// folded in whatever order their activities complete. Shards that ended
/// in a control-flow failure contribute nothing, not even their partial
/// `entities_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateScanReportResult {
    /// Entities visited across all successful shards.
    pub entities_count: u64,
    /// Entities classified corrupt.
    pub corrupted_count: u64,
    /// Entities whose check could not run.
    pub check_failed_count: u64,
    /// Corruption counts keyed by invariant name.
    pub corruption_by_type: BTreeMap<String, u64>,
}

impl AggregateScanReportResult {
    /// Fold one shard report into the totals.
    pub fn add_report(&mut self, report: &ScanReport) {
        if report.is_control_flow_failure() {
            return;
        }
        self.entities_count += report.stats.entities_count;
        self.corrupted_count += report.stats.corrupted_count;
        self.check_failed_count += report.stats.check_failed_count;
        for (invariant, count) in &report.stats.corruption_by_type {
            *self.corruption_by_type.entry(invariant.clone()).or_insert(0) += count;
        }
    }
}

/// Running totals across all completed fix shards. Same merge rules as
/// [`AggregateScanReportResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFixReportResult {
    /// Keys re-examined across all successful shards.
    pub entities_count: u64,
    /// Repairs applied.
    pub fixed_count: u64,
    /// Entities that needed no repair.
    pub skipped_count: u64,
    /// Repairs that failed.
    pub failed_count: u64,
}

impl AggregateFixReportResult {
    /// Fold one shard report into the totals.
    pub fn add_report(&mut self, report: &FixReport) {
        if report.is_control_flow_failure() {
            return;
        }
        self.entities_count += report.stats.entities_count;
        self.fixed_count += report.stats.fixed_count;
        self.skipped_count += report.stats.skipped_count;
        self.failed_count += report.stats.failed_count;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
