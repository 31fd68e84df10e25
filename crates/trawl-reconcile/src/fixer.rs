//! The fixer workflow.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::info;
use trawl_types::{
    AggregateFixReportResult, FixReport, FixShardActivityParams, FixShardConfigParams,
    FixerWorkflowParams, PaginatedShardQueryRequest, ResolvedFixerWorkflowConfig, ShardId,
    ShardStatus, ShardStatusQueryResult,
};

use crate::activity::FixerActivities;
use crate::batch::partition_batches;
use crate::corrupted_keys::get_corrupted_keys;
use crate::error::{ActivityError, WorkflowError};
use crate::query::{
    encode_result, paginate, parse_args, QueryError, AGGREGATE_REPORT_QUERY, SHARD_REPORT_QUERY,
    SHARD_STATUS_QUERY,
};

/// Query-visible state of a fixer run.
#[derive(Default)]
#[derive(Debug)]
struct FixState {
    status: BTreeMap<ShardId, ShardStatus>,
    reports: BTreeMap<ShardId, FixReport>,
    aggregate: AggregateFixReportResult,
}

impl FixState {
    fn record(&mut self, report: FixReport) {
        let shard_id = report.shard_id;
        let status = if report.is_control_flow_failure() {
            ShardStatus::ControlFlowFailure
        } else {
            ShardStatus::Success
        };
        self.status.insert(shard_id, status);
        self.aggregate.add_report(&report);
        self.reports.insert(shard_id, report);
    }
}

/// Locates a prior scanner run's corruption output, fans fix activities
/// out over the shards that had corruptions, and aggregates per-shard
/// outcomes.
///
/// The workflow's value is its queryable state: a successful run
/// returns `()`.
#[derive(Debug)]
pub struct FixerWorkflow {
    name: String,
    params: FixerWorkflowParams,
    state: Arc<RwLock<FixState>>,
}

impl FixerWorkflow {
    /// Validate the input and construct the workflow.
    pub fn new(
        name: impl Into<String>,
        params: FixerWorkflowParams,
    ) -> Result<Self, WorkflowError> {
        let name = name.into();
        if name.is_empty() {
            return Err(WorkflowError::Validation(
                "workflow name is not provided".to_string(),
            ));
        }
        Ok(Self {
            name,
            params,
            state: Arc::new(RwLock::new(FixState::default())),
        })
    }

    /// A handle answering this run's queries.
    pub fn queries(&self) -> FixerQueries {
        FixerQueries {
            state: self.state.clone(),
        }
    }

    /// Execute the run to completion.
    pub async fn run(&self, activities: Arc<dyn FixerActivities>) -> Result<(), WorkflowError> {
        let corrupted = get_corrupted_keys(activities.as_ref(), &self.params).await?;
        let config_results = activities
            .fixer_config(FixShardConfigParams::default())
            .await?;
        let resolved =
            ResolvedFixerWorkflowConfig::resolve(&self.params.fixer_workflow_config_overwrites);

        if corrupted.corrupted_keys.is_empty() {
            info!(workflow = %self.name, "scanner reported no corruptions, nothing to fix");
            return Ok(());
        }

        {
            let mut state = self.state.write().await;
            for entry in &corrupted.corrupted_keys {
                state.status.insert(entry.shard_id, ShardStatus::Running);
            }
        }

        // Only the shards that appeared in the corruption list are
        // visited; the scanner-observed [min, max] span just bounds
        // them.
        let batches = partition_batches(
            &corrupted.corrupted_keys,
            resolved.activity_batch_size,
            resolved.concurrency,
        );
        info!(
            workflow = %self.name,
            shards = corrupted.corrupted_keys.len(),
            min_shard = ?corrupted.min_shard,
            max_shard = ?corrupted.max_shard,
            batches = batches.len(),
            concurrency = resolved.concurrency,
            "dispatching shard fixes"
        );

        for wave in batches.chunks(resolved.concurrency.max(1)) {
            let mut tasks = JoinSet::new();
            for batch in wave {
                let activities = activities.clone();
                let params = FixShardActivityParams {
                    corrupted_keys_entries: batch.clone(),
                    resolved_fixer_workflow_config: resolved.clone(),
                    enabled_invariants: config_results.enabled_invariants.clone(),
                };
                tasks.spawn(async move { activities.fix_shard(params).await });
            }

            while let Some(joined) = tasks.join_next().await {
                let reports = joined
                    .map_err(|e| ActivityError::new(format!("fix shard activity panicked: {e}")))??;
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
            fixed = state.aggregate.fixed_count,
            skipped = state.aggregate.skipped_count,
            failed = state.aggregate.failed_count,
            "fix pass complete"
        );
        Ok(())
    }
}

/// Query handle over a fixer run.
#[derive(Clone)]
pub struct FixerQueries {
    state: Arc<RwLock<FixState>>,
}

impl FixerQueries {
    /// The running aggregate.
    pub async fn aggregate_report(&self) -> AggregateFixReportResult {
        self.state.read().await.aggregate.clone()
    }

    /// One shard's report, or `None` if it has not completed.
    pub async fn shard_report(&self, shard_id: ShardId) -> Option<FixReport> {
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

    /// Dispatch a query by its public name.
    ///
    /// The fixer produces no corruption pointers, so `shard_corrupt_keys`
    /// is not part of its surface.
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
            other => Err(QueryError::UnknownQuery(other.to_string())),
        }
    }
}
