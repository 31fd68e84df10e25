//! Scanner/fixer reconciliation workflows for Trawl.
//!
//! The core repeatedly sweeps every persistence shard of a cluster,
//! applies an ordered list of invariant checks to the entities within
//! each shard, records corruptions to the blob store, and later
//! re-reads those records to fix them. This crate provides:
//!
//! - [`ScannerWorkflow`] — deterministically enumerates a shard set,
//!   fans scan activities out in stride-assigned batches, and
//!   aggregates per-shard outcomes.
//! - [`FixerWorkflow`] — locates a prior scanner run via
//!   [`get_corrupted_keys`], fans fix activities out over the shards
//!   that had corruptions, and exposes the same query surface.
//! - [`ShardScanner`] / [`ShardFixer`] — the per-shard runners the
//!   activity layer wraps.
//! - [`Activities`] — the production activity implementation, behind
//!   the [`ScannerActivities`] / [`FixerActivities`] dispatch seams.
//! - [`query`] — the literal-named live query surface.
//!
//! The deterministic workflow engine itself (replay, timers, retry
//! policies) stays external; these workflows confine themselves to
//! what survives replay: activity results, pure batching, and ordered
//! maps.

pub mod activity;
pub mod batch;
mod corrupted_keys;
mod error;
mod fix;
mod fixer;
pub mod query;
mod scan;
mod scanner;

pub use activity::{
    default_fix_invariants, Activities, FixerActivities, ScannerActivities, ScannerQueryClient,
    WorkflowExecution,
};
pub use batch::partition_batches;
pub use corrupted_keys::get_corrupted_keys;
pub use error::{ActivityError, WorkflowError};
pub use fix::ShardFixer;
pub use fixer::{FixerQueries, FixerWorkflow};
pub use query::QueryError;
pub use scan::ShardScanner;
pub use scanner::{ScannerQueries, ScannerWorkflow};
