//! Shared types for the Trawl shard reconciliation core.
//!
//! This crate defines all core types used across the Trawl workspace:
//! shard selectors ([`Shards`], [`ShardRange`]), configuration
//! ([`GenericScannerConfig`], [`ResolvedScannerWorkflowConfig`],
//! [`ResolvedFixerWorkflowConfig`]), blob pointers ([`Keys`]),
//! scan/fix reports ([`report`]), pagination
//! ([`ShardQueryPaginationToken`], [`PaginatedShardQueryRequest`]),
//! and the parameter/result types exchanged between workflows and
//! activities.
//!
//! Everything here travels through the workflow engine serialized, so
//! every type derives `Serialize`/`Deserialize`. Maps are `BTreeMap`
//! throughout: workflow code iterates them, and iteration order must be
//! stable across replays.

pub mod report;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use report::{
    AggregateFixReportResult, AggregateScanReportResult, ControlFlowFailure, FixKeys, FixReport,
    FixResult, FixStats, ScanKeys, ScanReport, ScanResult, ScanStats,
};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A persistence shard number. Shards are numbered `[0, N)` where N is a
/// cluster constant.
pub type ShardId = u32;

/// Opaque identifier of a persisted entity within a shard.
///
/// This is the unit stored in corruption blob pages: the scanner writes
/// the keys of the entities it classified, the fixer reads them back and
/// re-resolves each against the persistence layer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey(pub String);

impl EntityKey {
    /// Create a key from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKey({})", self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Shard selection
// ---------------------------------------------------------------------------

/// A contiguous run of shards: `[min, max)`.
///
/// The upper bound is exclusive, so `ShardRange { min: 0, max: 30 }`
/// selects the thirty shards `0..=29`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRange {
    /// First shard selected (inclusive).
    pub min: ShardId,
    /// Upper bound (exclusive).
    pub max: ShardId,
}

/// The set of shards a workflow run covers.
///
/// Exactly one branch is populated by construction. The serde default
/// (an empty `List`) fails validation, so a caller that provides neither
/// branch gets a fast validation error rather than an empty run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shards {
    /// An inclusive-exclusive range, expanded in ascending order.
    Range(ShardRange),
    /// An explicit list, used exactly as given.
    List(Vec<ShardId>),
}

impl Default for Shards {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// A [`Shards`] value expanded to a flat list plus its observed bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedShards {
    /// Every shard the run covers, in selection order.
    pub ids: Vec<ShardId>,
    /// Smallest shard in the selection.
    pub min: ShardId,
    /// Largest shard in the selection.
    pub max: ShardId,
}

/// Validation failures for a [`Shards`] value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardsError {
    /// Neither a usable list nor a usable range was supplied.
    #[error("must provide either List or Range")]
    Unspecified,

    /// A range whose lower bound exceeds its upper bound.
    #[error("shard range min {min} exceeds max {max}")]
    InvertedRange {
        /// The offending lower bound.
        min: ShardId,
        /// The offending upper bound.
        max: ShardId,
    },
}

impl Shards {
    /// Check the selection without expanding it.
    pub fn validate(&self) -> Result<(), ShardsError> {
        self.flatten().map(|_| ())
    }

    /// Expand the selection into a flat shard list with observed bounds.
    ///
    /// An empty list (including the serde default) and a range selecting
    /// nothing both fail with [`ShardsError::Unspecified`].
    pub fn flatten(&self) -> Result<FlattenedShards, ShardsError> {
        let ids: Vec<ShardId> = match self {
            Shards::Range(range) => {
                if range.min > range.max {
                    return Err(ShardsError::InvertedRange {
                        min: range.min,
                        max: range.max,
                    });
                }
                (range.min..range.max).collect()
            }
            Shards::List(list) => list.clone(),
        };

        if ids.is_empty() {
            return Err(ShardsError::Unspecified);
        }

        let min = *ids.iter().min().expect("non-empty");
        let max = *ids.iter().max().expect("non-empty");
        Ok(FlattenedShards { ids, min, max })
    }
}

// ---------------------------------------------------------------------------
// Blob pointers
// ---------------------------------------------------------------------------

/// Pointer to a run of blob-store pages holding [`EntityKey`] records.
///
/// `uuid` is the blob key prefix; the pages live at `{uuid}/{page}` for
/// `page` in `[min_page, max_page]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    /// Blob key prefix under which the pages were written.
    pub uuid: String,
    /// First page of the run.
    pub min_page: u64,
    /// Last page of the run (inclusive).
    pub max_page: u64,
}

/// One shard's corruption output: emitted by the scanner for every shard
/// that had at least one corrupted entity, consumed by the fixer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptedKeysEntry {
    /// The shard the keys belong to.
    pub shard_id: ShardId,
    /// Pointer to the corrupted-entity key pages.
    pub corrupted_keys: Keys,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default number of concurrently running shard activities.
pub const DEFAULT_CONCURRENCY: usize = 25;
/// Default number of shards handed to a single activity invocation.
pub const DEFAULT_ACTIVITY_BATCH_SIZE: usize = 25;
/// Default persistence cursor page size.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Default number of buffered entries before a blob page is flushed.
pub const DEFAULT_BLOBSTORE_FLUSH_THRESHOLD: usize = 1000;

/// Mapping `invariant name → "true" | "false"` enumerating which
/// invariants are active for a run.
pub type CustomScannerConfig = BTreeMap<String, String>;

/// Scanner knobs shared by every scanner regardless of entity type.
///
/// `enabled == false` is the kill-switch: the workflow completes
/// successfully without dispatching a single scan activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericScannerConfig {
    /// Whether scanning is enabled at all.
    pub enabled: bool,
    /// How many shard activities run concurrently (> 0).
    pub concurrency: usize,
    /// How many shards one activity invocation covers (> 0).
    pub activity_batch_size: usize,
    /// Persistence cursor page size (> 0).
    pub page_size: usize,
}

impl Default for GenericScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: DEFAULT_CONCURRENCY,
            activity_batch_size: DEFAULT_ACTIVITY_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Optional overrides applied over [`GenericScannerConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericScannerConfigOverwrites {
    /// Override for [`GenericScannerConfig::enabled`].
    pub enabled: Option<bool>,
    /// Override for [`GenericScannerConfig::concurrency`].
    pub concurrency: Option<usize>,
    /// Override for [`GenericScannerConfig::activity_batch_size`].
    pub activity_batch_size: Option<usize>,
    /// Override for [`GenericScannerConfig::page_size`].
    pub page_size: Option<usize>,
}

impl GenericScannerConfig {
    /// Apply overwrites over this config, field by field.
    pub fn apply(mut self, overwrites: &GenericScannerConfigOverwrites) -> Self {
        if let Some(enabled) = overwrites.enabled {
            self.enabled = enabled;
        }
        if let Some(concurrency) = overwrites.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(batch_size) = overwrites.activity_batch_size {
            self.activity_batch_size = batch_size;
        }
        if let Some(page_size) = overwrites.page_size {
            self.page_size = page_size;
        }
        self
    }
}

/// Caller-supplied overrides for a scanner workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerWorkflowConfigOverwrites {
    /// Overrides for the generic knobs.
    pub generic_scanner_config_overwrites: GenericScannerConfigOverwrites,
    /// Override for the blob flush threshold.
    pub blobstore_flush_threshold: Option<usize>,
    /// Replacement for the default invariant enablement mapping.
    pub custom_scanner_config: Option<CustomScannerConfig>,
}

/// Fully materialized scanner configuration, frozen at workflow start by
/// the config-resolution activity so replay stays deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedScannerWorkflowConfig {
    /// The resolved generic knobs.
    pub generic_scanner_config: GenericScannerConfig,
    /// Max entries buffered per shard before forcing a blob flush.
    pub blobstore_flush_threshold: usize,
    /// Which invariants are active for this run.
    pub custom_scanner_config: CustomScannerConfig,
}

impl ResolvedScannerWorkflowConfig {
    /// Resolve overwrites over defaults.
    ///
    /// `default_custom` is the invariant enablement mapping used when the
    /// caller supplied none (normally: every registered invariant on).
    pub fn resolve(
        overwrites: &ScannerWorkflowConfigOverwrites,
        default_custom: CustomScannerConfig,
    ) -> Self {
        Self {
            generic_scanner_config: GenericScannerConfig::default()
                .apply(&overwrites.generic_scanner_config_overwrites),
            blobstore_flush_threshold: overwrites
                .blobstore_flush_threshold
                .unwrap_or(DEFAULT_BLOBSTORE_FLUSH_THRESHOLD),
            custom_scanner_config: overwrites
                .custom_scanner_config
                .clone()
                .unwrap_or(default_custom),
        }
    }
}

/// Caller-supplied overrides for a fixer workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerWorkflowConfigOverwrites {
    /// Override for the fix activity concurrency.
    pub concurrency: Option<usize>,
    /// Override for the fix activity batch size.
    pub activity_batch_size: Option<usize>,
    /// Override for the blob flush threshold.
    pub blobstore_flush_threshold: Option<usize>,
}

/// Fully materialized fixer configuration.
///
/// Resolution is a pure function of the overwrites, so the fixer
/// workflow computes it inline rather than through an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFixerWorkflowConfig {
    /// How many fix activities run concurrently.
    pub concurrency: usize,
    /// How many shards one fix activity invocation covers.
    pub activity_batch_size: usize,
    /// Max entries buffered per shard before forcing a blob flush.
    pub blobstore_flush_threshold: usize,
}

impl Default for ResolvedFixerWorkflowConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            activity_batch_size: DEFAULT_ACTIVITY_BATCH_SIZE,
            blobstore_flush_threshold: DEFAULT_BLOBSTORE_FLUSH_THRESHOLD,
        }
    }
}

impl ResolvedFixerWorkflowConfig {
    /// Resolve overwrites over defaults.
    pub fn resolve(overwrites: &FixerWorkflowConfigOverwrites) -> Self {
        let defaults = Self::default();
        Self {
            concurrency: overwrites.concurrency.unwrap_or(defaults.concurrency),
            activity_batch_size: overwrites
                .activity_batch_size
                .unwrap_or(defaults.activity_batch_size),
            blobstore_flush_threshold: overwrites
                .blobstore_flush_threshold
                .unwrap_or(defaults.blobstore_flush_threshold),
        }
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Cursor for shard-keyed paginations.
///
/// `is_done == true` implies `next_shard_id == None`. The same shape is
/// reused by the cross-workflow corrupted-keys stream and the live query
/// surface; each caller tracks its own cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardQueryPaginationToken {
    /// Where the next request should start, when more shards remain.
    pub next_shard_id: Option<ShardId>,
    /// Whether the pagination is exhausted.
    pub is_done: bool,
}

/// A page request against a shard-keyed query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginatedShardQueryRequest {
    /// First shard of the page; defaults to the smallest tracked shard.
    pub starting_shard_id: Option<ShardId>,
    /// Page size; defaults to the query surface maximum.
    pub limit_shards: Option<usize>,
}

// ---------------------------------------------------------------------------
// Shard status
// ---------------------------------------------------------------------------

/// Per-shard processing summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardStatus {
    /// The shard's activity has not returned yet.
    Running,
    /// The shard could not be processed at all.
    ControlFlowFailure,
    /// The shard was processed and classified.
    Success,
}

/// Mapping `shard → status` for a page of shards.
pub type ShardStatusResult = BTreeMap<ShardId, ShardStatus>;

/// One page of the `shard_status` query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStatusQueryResult {
    /// Statuses for the requested window.
    pub result: ShardStatusResult,
    /// Cursor for the next page.
    pub shard_query_pagination_token: ShardQueryPaginationToken,
}

/// Mapping `shard → corrupted-keys pointer` for a page of shards.
pub type ShardCorruptKeysResult = BTreeMap<ShardId, Keys>;

/// One page of the `shard_corrupt_keys` query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardCorruptKeysQueryResult {
    /// Corrupted-key pointers for the requested window.
    pub result: ShardCorruptKeysResult,
    /// Cursor for the next page.
    pub shard_query_pagination_token: ShardQueryPaginationToken,
}

// ---------------------------------------------------------------------------
// Workflow parameters and results
// ---------------------------------------------------------------------------

/// Input to the scanner workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerWorkflowParams {
    /// Which shards this run covers.
    pub shards: Shards,
    /// Caller overrides applied over compile-time defaults.
    pub scanner_workflow_config_overwrites: ScannerWorkflowConfigOverwrites,
}

/// Input to the fixer workflow: names the scanner execution whose output
/// should be fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerWorkflowParams {
    /// Workflow ID of the scanner execution.
    pub scanner_workflow_workflow_id: String,
    /// Run ID of the scanner execution.
    pub scanner_workflow_run_id: String,
    /// Caller overrides applied over compile-time defaults.
    pub fixer_workflow_config_overwrites: FixerWorkflowConfigOverwrites,
}

/// Final result of a scanner workflow run: the aggregate plus one
/// [`CorruptedKeysEntry`] per shard that produced corruptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerWorkflowResult {
    /// Running totals over all successfully processed shards.
    pub aggregate: AggregateScanReportResult,
    /// Corruption pointers in ascending shard order.
    pub corrupted_keys: Vec<CorruptedKeysEntry>,
}

// ---------------------------------------------------------------------------
// Activity parameters and results
// ---------------------------------------------------------------------------

/// Input to the scanner config-resolution activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfigActivityParams {
    /// The caller's overrides, passed through from the workflow input.
    pub overwrites: ScannerWorkflowConfigOverwrites,
}

/// Input to one scan activity invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanShardActivityParams {
    /// The batch of shards to scan.
    pub shards: Vec<ShardId>,
    /// Persistence cursor page size.
    pub page_size: usize,
    /// Max buffered entries before a blob flush.
    pub blobstore_flush_threshold: usize,
    /// Which invariants are active.
    pub custom_scanner_config: CustomScannerConfig,
}

/// Input to the cross-workflow corrupted-keys lookup activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerCorruptedKeysActivityParams {
    /// Workflow ID of the scanner execution to query.
    pub scanner_workflow_workflow_id: String,
    /// Run ID of the scanner execution to query.
    pub scanner_workflow_run_id: String,
    /// Pagination cursor; `None` starts from the beginning.
    pub starting_shard_id: Option<ShardId>,
}

/// One page of corrupted keys pulled from a scanner execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixerCorruptedKeysActivityResult {
    /// Corruption entries in ascending shard order.
    pub corrupted_keys: Vec<CorruptedKeysEntry>,
    /// Smallest shard observed in this page, if any.
    pub min_shard: Option<ShardId>,
    /// Largest shard observed in this page, if any.
    pub max_shard: Option<ShardId>,
    /// Cursor for the next page.
    pub shard_query_pagination_token: ShardQueryPaginationToken,
}

/// Input to the fixer config-resolution activity. Currently empty; the
/// shape exists so the activity signature can grow without breaking
/// recorded histories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixShardConfigParams {}

/// Output of the fixer config-resolution activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixShardConfigResults {
    /// Which invariants the fixer should re-evaluate and repair.
    pub enabled_invariants: CustomScannerConfig,
}

/// Input to one fix activity invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixShardActivityParams {
    /// The batch of per-shard corruption entries to fix.
    pub corrupted_keys_entries: Vec<CorruptedKeysEntry>,
    /// The run's resolved fixer configuration.
    pub resolved_fixer_workflow_config: ResolvedFixerWorkflowConfig,
    /// Which invariants are active.
    pub enabled_invariants: CustomScannerConfig,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_flattens_half_open() {
        let shards = Shards::Range(ShardRange { min: 0, max: 30 });
        let flat = shards.flatten().unwrap();
        assert_eq!(flat.ids.len(), 30);
        assert_eq!(flat.ids[0], 0);
        assert_eq!(flat.ids[29], 29);
        assert_eq!(flat.min, 0);
        assert_eq!(flat.max, 29);
    }

    #[test]
    fn test_list_flattens_as_given() {
        let shards = Shards::List(vec![7, 3, 11]);
        let flat = shards.flatten().unwrap();
        assert_eq!(flat.ids, vec![7, 3, 11]);
        assert_eq!(flat.min, 3);
        assert_eq!(flat.max, 11);
    }

    #[test]
    fn test_empty_list_is_unspecified() {
        let err = Shards::List(vec![]).flatten().unwrap_err();
        assert_eq!(err, ShardsError::Unspecified);
        assert_eq!(err.to_string(), "must provide either List or Range");
    }

    #[test]
    fn test_default_shards_fail_validation() {
        assert_eq!(
            Shards::default().validate().unwrap_err(),
            ShardsError::Unspecified
        );
    }

    #[test]
    fn test_empty_range_is_unspecified() {
        let err = Shards::Range(ShardRange { min: 5, max: 5 })
            .flatten()
            .unwrap_err();
        assert_eq!(err, ShardsError::Unspecified);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = Shards::Range(ShardRange { min: 9, max: 3 })
            .flatten()
            .unwrap_err();
        assert!(matches!(err, ShardsError::InvertedRange { min: 9, max: 3 }));
    }

    #[test]
    fn test_generic_config_defaults() {
        let config = GenericScannerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.activity_batch_size, DEFAULT_ACTIVITY_BATCH_SIZE);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_generic_config_apply_overwrites() {
        let config = GenericScannerConfig::default().apply(&GenericScannerConfigOverwrites {
            enabled: Some(false),
            concurrency: Some(3),
            activity_batch_size: None,
            page_size: Some(10),
        });
        assert!(!config.enabled);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.activity_batch_size, DEFAULT_ACTIVITY_BATCH_SIZE);
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_resolve_scanner_config_keeps_default_custom() {
        let default_custom: CustomScannerConfig =
            [("history".to_string(), "true".to_string())].into();
        let resolved = ResolvedScannerWorkflowConfig::resolve(
            &ScannerWorkflowConfigOverwrites::default(),
            default_custom.clone(),
        );
        assert_eq!(resolved.custom_scanner_config, default_custom);
        assert_eq!(
            resolved.blobstore_flush_threshold,
            DEFAULT_BLOBSTORE_FLUSH_THRESHOLD
        );
    }

    #[test]
    fn test_resolve_scanner_config_custom_overwrite_wins() {
        let overwrite_custom: CustomScannerConfig =
            [("stale".to_string(), "false".to_string())].into();
        let resolved = ResolvedScannerWorkflowConfig::resolve(
            &ScannerWorkflowConfigOverwrites {
                custom_scanner_config: Some(overwrite_custom.clone()),
                blobstore_flush_threshold: Some(7),
                ..Default::default()
            },
            CustomScannerConfig::new(),
        );
        assert_eq!(resolved.custom_scanner_config, overwrite_custom);
        assert_eq!(resolved.blobstore_flush_threshold, 7);
    }

    #[test]
    fn test_resolve_fixer_config() {
        let resolved = ResolvedFixerWorkflowConfig::resolve(&FixerWorkflowConfigOverwrites {
            concurrency: Some(3),
            activity_batch_size: Some(5),
            blobstore_flush_threshold: None,
        });
        assert_eq!(resolved.concurrency, 3);
        assert_eq!(resolved.activity_batch_size, 5);
        assert_eq!(
            resolved.blobstore_flush_threshold,
            DEFAULT_BLOBSTORE_FLUSH_THRESHOLD
        );
    }

    #[test]
    fn test_pagination_token_default_is_open() {
        let token = ShardQueryPaginationToken::default();
        assert!(!token.is_done);
        assert_eq!(token.next_shard_id, None);
    }

    // --- Serialization round-trips ---

    #[test]
    fn test_shards_roundtrip_postcard() {
        for shards in [
            Shards::Range(ShardRange { min: 0, max: 30 }),
            Shards::List(vec![1, 2, 3]),
        ] {
            let encoded = postcard::to_allocvec(&shards).unwrap();
            let decoded: Shards = postcard::from_bytes(&encoded).unwrap();
            assert_eq!(shards, decoded);
        }
    }

    #[test]
    fn test_keys_roundtrip_postcard() {
        let keys = Keys {
            uuid: "wid/rid/7/corrupt".to_string(),
            min_page: 0,
            max_page: 4,
        };
        let encoded = postcard::to_allocvec(&keys).unwrap();
        let decoded: Keys = postcard::from_bytes(&encoded).unwrap();
        assert_eq!(keys, decoded);
    }

    #[test]
    fn test_scanner_params_roundtrip_json() {
        let params = ScannerWorkflowParams {
            shards: Shards::Range(ShardRange { min: 0, max: 16 }),
            scanner_workflow_config_overwrites: ScannerWorkflowConfigOverwrites {
                generic_scanner_config_overwrites: GenericScannerConfigOverwrites {
                    concurrency: Some(4),
                    ..Default::default()
                },
                ..Default::default()
            },
        };
        let encoded = serde_json::to_string(&params).unwrap();
        let decoded: ScannerWorkflowParams = serde_json::from_str(&encoded).unwrap();
        assert_eq!(params, decoded);
    }

    #[test]
    fn test_paginated_request_deserializes_from_empty_object() {
        let req: PaginatedShardQueryRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, PaginatedShardQueryRequest::default());
    }
}
