//! The scanner workflow.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::info;
use trawl_types::{
    AggregateScanReportResult, CorruptedKeysEntry, FlattenedShards, Keys,
    PaginatedShardQueryRequest, ScanReport, ScanShardActivityParams, ScannerConfigActivityParams,
    ScannerWorkflowParams, ScannerWorkflowResult, ShardCorruptKeysQueryResult, ShardId,
    ShardStatus, ShardStatusQueryResult,
};

use crate::activity::ScannerActivities;
use crate::batch::partition_batches;
use crate::error::{ActivityError, WorkflowError};
use crate::query::{
    encode_result, paginate, parse_args, QueryError, AGGREGATE_REPORT_QUERY,
    SHARD_CORRUPT_KEYS_QUERY, SHARD_REPORT_QUERY, SHARD_STATUS_QUERY,
};

/// Query-visible state of a scanner run.
#[derive(Default)]
#[derive(Debug)]
struct ScanState {
    status: BTreeMap<ShardId, ShardStatus>,
    reports: BTreeMap<ShardId, ScanReport>,
    aggregate: AggregateScanReportResult,
    corrupt_keys: BTreeMap<ShardId, Keys>,
}

impl ScanState {
    fn record(&mut self, report: ScanReport) {
        let shard_id = report.shard_id;
        let status = if report.is_control_flow_failure() {
            ShardStatus::ControlFlowFailure
        } else {
            ShardStatus::Success
        };
        self.status.insert(shard_id, status);
        self.aggregate.add_report(&report);
        if report.stats.corrupted_count > 0 {
            if let Some(keys) = report.corrupt_keys() {
                self.corrupt_keys.insert(shard_id, keys.clone());
            }
        }
        self.reports.insert(shard_id, report);
    }
}

/// Deterministically enumerates a shard set, fans scan activities out
/// in stride-assigned batches, and aggregates per-shard outcomes.
///
/// Construction validates the input; [`run`](Self::run) performs the
/// orchestration. Query handles obtained from
/// [`queries`](Self::queries) stay answerable while the run is in
/// flight and after it completes.
#[derive(Debug)]
pub struct ScannerWorkflow {
    name: String,
    params: ScannerWorkflowParams,
    flattened: FlattenedShards,
    state: Arc<RwLock<ScanState>>,
}

impl ScannerWorkflow {
    /// Validate the input and construct the workflow.
    pub fn new(
        name: impl Into<String>,
        params: ScannerWorkflowParams,
    ) -> Result<Self, WorkflowError> {
        let name = name.into();
        if name.is_empty() {
            return Err(WorkflowError::Validation(
                "workflow name is not provided".to_string(),
            ));
        }
        let flattened = params.shards.flatten()?;
        Ok(Self {
            name,
            params,
            flattened,
            state: Arc::new(RwLock::new(ScanState::default())),
        })
    }

    /// A handle answering this run's queries.
    pub fn queries(&self) -> ScannerQueries {
        ScannerQueries {
            state: self.state.clone(),
        }
    }

    /// Execute the run to completion.
    pub async fn run(
        &self,
        activities: Arc<dyn ScannerActivities>,
    ) -> Result<ScannerWorkflowResult, WorkflowError> {
        let resolved = activities
            .scanner_config(ScannerConfigActivityParams {
                overwrites: self.params.scanner_workflow_config_overwrites.clone(),
            })
            .await?;

        let config = &resolved.generic_scanner_config;
        if !config.enabled {
            info!(workflow = %self.name, "scanning disabled, completing without work");
            return Ok(ScannerWorkflowResult::default());
        }

        {
            let mut state = self.state.write().await;
            for &shard_id in &self.flattened.ids {
                state.status.insert(shard_id, ShardStatus::Running);
            }
        }

        let batches = partition_batches(
            &self.flattened.ids,
            config.activity_batch_size,
            config.concurrency,
        );
        info!(
            workflow = %self.name,
            shards = self.flattened.ids.len(),
            batches = batches.len(),
            concurrency = config.concurrency,
            "dispatching shard scans"
        );

        for wave in batches.chunks(config.concurrency.max(1)) {
            let mut tasks = JoinSet::new();
            for batch in wave {
                let activities = activities.clone();
                let params = ScanShardActivityParams {
                    shards: batch.clone(),
                    page_size: config.page_size,
                    blobstore_flush_threshold: resolved.blobstore_flush_threshold,
                    custom_scanner_config: resolved.custom_scanner_config.clone(),
                };
                tasks.spawn(async move { activities.scan_shard(params).await });
            }

            // Completion order within the wave is arbitrary; recording
            // is commutative. The first activity error aborts the run
            // and cancels the wave's remaining activities.
            while let Some(joined) = tasks.join_next().await {
                let reports = joined
                    .map_err(|e| ActivityError::new(format!("scan shard activity panicked: {e}")))??;
                let mut state = self.state.write().await;
                for report in reports {
                    state.record(report);
                }
            }
        }

        let state = self.state.read().await;
        info!(
            workflow = %self.name,
            entities = state.aggregate.entities_count,
            corrupted = state.aggregate.corrupted_count,
            "scan pass complete"
        );
        Ok(ScannerWorkflowResult {
            aggregate: state.aggregate.clone(),
            corrupted_keys: state
                .corrupt_keys
                .iter()
                .map(|(&shard_id, keys)| CorruptedKeysEntry {
                    shard_id,
                    corrupted_keys: keys.clone(),
                })
                .collect(),
        })
    }
}

/// Query handle over a scanner run.
#[derive(Clone)]
pub struct ScannerQueries {
    state: Arc<RwLock<ScanState>>,
}

impl ScannerQueries {
    /// The running aggregate.
    pub async fn aggregate_report(&self) -> AggregateScanReportResult {
        self.state.read().await.aggregate.clone()
    }

    /// One shard's report, or `None` if it has not completed.
    pub async fn shard_report(&self, shard_id: ShardId) -> Option<ScanReport> {
        self.state.read().await.reports.get(&shard_id).cloned()
    }

    /// One page of per-shard statuses.
    pub async fn shard_status(
        &self,
        request: &PaginatedShardQueryRequest,
    ) -> ShardStatusQueryResult {
        let state = self.state.read().await;
        let (result, shard_query_pagination_token) = paginate(&state.status, request);
        ShardStatusQueryResult {
            result,
            shard_query_pagination_token,
        }
    }

    /// One page of corrupted-key pointers.
    pub async fn shard_corrupt_keys(
        &self,
        request: &PaginatedShardQueryRequest,
    ) -> ShardCorruptKeysQueryResult {
        let state = self.state.read().await;
        let (result, shard_query_pagination_token) = paginate(&state.corrupt_keys, request);
        ShardCorruptKeysQueryResult {
            result,
            shard_query_pagination_token,
        }
    }

    /// Dispatch a query by its public name.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<Value, QueryError> {
        match name {
            AGGREGATE_REPORT_QUERY => encode_result(&self.aggregate_report().await),
            SHARD_REPORT_QUERY => {
                let shard_id: ShardId = serde_json::from_value(args)
                    .map_err(|e| QueryError::InvalidArguments(e.to_string()))?;
                encode_result(&self.shard_report(shard_id).await)
            }
            SHARD_STATUS_QUERY => {
                let request: PaginatedShardQueryRequest = parse_args(args)?;
                encode_result(&self.shard_status(&request).await)
            }
            SHARD_CORRUPT_KEYS_QUERY => {
                let request: PaginatedShardQueryRequest = parse_args(args)?;
                encode_result(&self.shard_corrupt_keys(&request).await)
            }
            other => Err(QueryError::UnknownQuery(other.to_string())),
        }
    }
}
