//! The activity layer.
//!
//! Workflows never touch persistence directly: everything effectful
//! goes through the [`ScannerActivities`] / [`FixerActivities`] seams,
//! which the engine dispatches with at-least-once semantics (and which
//! tests replace with programmed mocks). [`Activities`] is the
//! production implementation, wired to an entity store, a blob store,
//! and the ordered invariant registry.

use std::sync::Arc;

use tracing::info;
use trawl_blob::Blobstore;
use trawl_invariant::{
    EntityStore, InvariantManager, COLLECTION_HISTORY, COLLECTION_MUTABLE_STATE, COLLECTION_STALE,
};
use trawl_types::{
    CorruptedKeysEntry, CustomScannerConfig, FixReport, FixShardActivityParams,
    FixShardConfigParams, FixShardConfigResults, FixerCorruptedKeysActivityParams,
    FixerCorruptedKeysActivityResult, PaginatedShardQueryRequest, ResolvedScannerWorkflowConfig,
    ScanReport, ScanShardActivityParams, ScannerConfigActivityParams, ShardCorruptKeysQueryResult,
};

use crate::error::ActivityError;
use crate::fix::ShardFixer;
use crate::query::MAX_SHARD_QUERY_RESULT;
use crate::scan::ShardScanner;

/// Identity of the workflow execution an activity serves, provided by
/// the engine's activity context. Blob key prefixes derive from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowExecution {
    /// The workflow ID.
    pub workflow_id: String,
    /// The run ID.
    pub run_id: String,
}

impl WorkflowExecution {
    /// Build an execution identity.
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }

    /// The blob key scope for this execution: `{workflowID}/{runID}`.
    pub fn key_scope(&self) -> String {
        format!("{}/{}", self.workflow_id, self.run_id)
    }
}

/// Activities the scanner workflow dispatches.
#[async_trait::async_trait]
pub trait ScannerActivities: Send + Sync {
    /// Resolve the run's configuration, applying overwrites over defaults.
    async fn scanner_config(
        &self,
        params: ScannerConfigActivityParams,
    ) -> Result<ResolvedScannerWorkflowConfig, ActivityError>;

    /// Scan one batch of shards, producing one report per shard.
    ///
    /// A shard that cannot be processed yields a control-flow-failure
    /// report, which is a value. An `Err` from this method means the
    /// activity itself failed, and the workflow aborts with it.
    async fn scan_shard(
        &self,
        params: ScanShardActivityParams,
    ) -> Result<Vec<ScanReport>, ActivityError>;
}

/// Activities the fixer workflow dispatches.
#[async_trait::async_trait]
pub trait FixerActivities: Send + Sync {
    /// Resolve which invariants the fixer should re-evaluate.
    async fn fixer_config(
        &self,
        params: FixShardConfigParams,
    ) -> Result<FixShardConfigResults, ActivityError>;

    /// Pull one page of corrupted keys from a scanner execution.
    async fn fixer_corrupted_keys(
        &self,
        params: FixerCorruptedKeysActivityParams,
    ) -> Result<FixerCorruptedKeysActivityResult, ActivityError>;

    /// Fix one batch of shards, producing one report per shard.
    async fn fix_shard(
        &self,
        params: FixShardActivityParams,
    ) -> Result<Vec<FixReport>, ActivityError>;
}

/// Issues queries against another workflow execution.
///
/// The fixer never holds a reference to the scanner's in-memory state;
/// the lookup goes through the engine's query facility, behind this
/// seam.
#[async_trait::async_trait]
pub trait ScannerQueryClient: Send + Sync {
    /// Invoke the scanner execution's `shard_corrupt_keys` query.
    async fn shard_corrupt_keys(
        &self,
        workflow_id: &str,
        run_id: &str,
        request: PaginatedShardQueryRequest,
    ) -> Result<ShardCorruptKeysQueryResult, ActivityError>;
}

/// Placeholder client for workers that never run fixer activities.
struct UnconfiguredQueryClient;

#[async_trait::async_trait]
impl ScannerQueryClient for UnconfiguredQueryClient {
    async fn shard_corrupt_keys(
        &self,
        _workflow_id: &str,
        _run_id: &str,
        _request: PaginatedShardQueryRequest,
    ) -> Result<ShardCorruptKeysQueryResult, ActivityError> {
        Err(ActivityError::new("scanner query client not configured"))
    }
}

/// The default fixer invariant enablement: history and mutable-state
/// on, staleness off.
pub fn default_fix_invariants() -> CustomScannerConfig {
    [
        (COLLECTION_HISTORY.to_string(), "true".to_string()),
        (COLLECTION_MUTABLE_STATE.to_string(), "true".to_string()),
        (COLLECTION_STALE.to_string(), "false".to_string()),
    ]
    .into()
}

/// Production implementation of both activity families.
pub struct Activities {
    entity_store: Arc<dyn EntityStore>,
    blobstore: Arc<dyn Blobstore>,
    invariants: InvariantManager,
    execution: WorkflowExecution,
    query_client: Arc<dyn ScannerQueryClient>,
    fix_invariants: CustomScannerConfig,
    corrupted_keys_page_size: usize,
}

impl Activities {
    /// Wire the activity layer for one workflow execution.
    pub fn new(
        entity_store: Arc<dyn EntityStore>,
        blobstore: Arc<dyn Blobstore>,
        invariants: InvariantManager,
        execution: WorkflowExecution,
    ) -> Self {
        Self {
            entity_store,
            blobstore,
            invariants,
            execution,
            query_client: Arc::new(UnconfiguredQueryClient),
            fix_invariants: default_fix_invariants(),
            corrupted_keys_page_size: MAX_SHARD_QUERY_RESULT,
        }
    }

    /// Provide the query client used by [`FixerActivities::fixer_corrupted_keys`].
    pub fn with_query_client(mut self, client: Arc<dyn ScannerQueryClient>) -> Self {
        self.query_client = client;
        self
    }

    /// Replace the default fixer invariant enablement.
    pub fn with_fix_invariants(mut self, invariants: CustomScannerConfig) -> Self {
        self.fix_invariants = invariants;
        self
    }

    /// Set the page size used when pulling corrupted keys.
    pub fn with_corrupted_keys_page_size(mut self, page_size: usize) -> Self {
        self.corrupted_keys_page_size = page_size.max(1);
        self
    }

    /// Every registered invariant, enabled.
    fn default_scan_invariants(&self) -> CustomScannerConfig {
        self.invariants
            .names()
            .into_iter()
            .map(|name| (name.to_string(), "true".to_string()))
            .collect()
    }
}

#[async_trait::async_trait]
impl ScannerActivities for Activities {
    async fn scanner_config(
        &self,
        params: ScannerConfigActivityParams,
    ) -> Result<ResolvedScannerWorkflowConfig, ActivityError> {
        let resolved = ResolvedScannerWorkflowConfig::resolve(
            &params.overwrites,
            self.default_scan_invariants(),
        );

        let generic = &resolved.generic_scanner_config;
        if generic.concurrency == 0 {
            return Err(ActivityError::new("scanner concurrency must be positive"));
        }
        if generic.activity_batch_size == 0 {
            return Err(ActivityError::new(
                "scanner activity batch size must be positive",
            ));
        }
        if generic.page_size == 0 {
            return Err(ActivityError::new("scanner page size must be positive"));
        }

        info!(
            enabled = generic.enabled,
            concurrency = generic.concurrency,
            batch_size = generic.activity_batch_size,
            "resolved scanner config"
        );
        Ok(resolved)
    }

    async fn scan_shard(
        &self,
        params: ScanShardActivityParams,
    ) -> Result<Vec<ScanReport>, ActivityError> {
        let scanner = ShardScanner::new(
            self.entity_store.clone(),
            self.blobstore.clone(),
            self.invariants.filtered(&params.custom_scanner_config),
            params.page_size,
            params.blobstore_flush_threshold,
            self.execution.key_scope(),
        );

        let mut reports = Vec::with_capacity(params.shards.len());
        for shard_id in params.shards {
            reports.push(scanner.scan_shard(shard_id).await);
        }
        Ok(reports)
    }
}

#[async_trait::async_trait]
impl FixerActivities for Activities {
    async fn fixer_config(
        &self,
        _params: FixShardConfigParams,
    ) -> Result<FixShardConfigResults, ActivityError> {
        Ok(FixShardConfigResults {
            enabled_invariants: self.fix_invariants.clone(),
        })
    }

    async fn fixer_corrupted_keys(
        &self,
        params: FixerCorruptedKeysActivityParams,
    ) -> Result<FixerCorruptedKeysActivityResult, ActivityError> {
        let request = PaginatedShardQueryRequest {
            starting_shard_id: params.starting_shard_id,
            limit_shards: Some(self.corrupted_keys_page_size),
        };
        let page = self
            .query_client
            .shard_corrupt_keys(
                &params.scanner_workflow_workflow_id,
                &params.scanner_workflow_run_id,
                request,
            )
            .await?;

        let min_shard = page.result.keys().next().copied();
        let max_shard = page.result.keys().next_back().copied();
        let corrupted_keys = page
            .result
            .into_iter()
            .map(|(shard_id, corrupted_keys)| CorruptedKeysEntry {
                shard_id,
                corrupted_keys,
            })
            .collect();

        Ok(FixerCorruptedKeysActivityResult {
            corrupted_keys,
            min_shard,
            max_shard,
            shard_query_pagination_token: page.shard_query_pagination_token,
        })
    }

    async fn fix_shard(
        &self,
        params: FixShardActivityParams,
    ) -> Result<Vec<FixReport>, ActivityError> {
        let fixer = ShardFixer::new(
            self.entity_store.clone(),
            self.blobstore.clone(),
            self.invariants.filtered(&params.enabled_invariants),
            params.resolved_fixer_workflow_config.blobstore_flush_threshold,
            self.execution.key_scope(),
        );

        let mut reports = Vec::with_capacity(params.corrupted_keys_entries.len());
        for entry in &params.corrupted_keys_entries {
            reports.push(fixer.fix_shard(entry).await);
        }
        Ok(reports)
    }
}
