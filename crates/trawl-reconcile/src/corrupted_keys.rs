//! The `GetCorruptedKeys` child workflow.

use tracing::info;
use trawl_types::{
    FixerCorruptedKeysActivityParams, FixerCorruptedKeysActivityResult, FixerWorkflowParams,
    ShardId, ShardQueryPaginationToken,
};

use crate::activity::FixerActivities;
use crate::error::{ActivityError, WorkflowError};

/// Stream every corrupted-keys page out of a scanner execution and
/// merge them.
///
/// Entries concatenate in page-arrival order. `min_shard`/`max_shard`
/// merge across the non-empty pages; pages with no entries are skipped
/// in that merge but still honored for pagination. Any activity error
/// mid-stream fails the whole lookup. On success the returned token is
/// always `{is_done: true, next_shard_id: None}`.
pub async fn get_corrupted_keys(
    activities: &dyn FixerActivities,
    params: &FixerWorkflowParams,
) -> Result<FixerCorruptedKeysActivityResult, WorkflowError> {
    let mut merged = FixerCorruptedKeysActivityResult::default();
    let mut starting_shard_id: Option<ShardId> = None;

    loop {
        let page = activities
            .fixer_corrupted_keys(FixerCorruptedKeysActivityParams {
                scanner_workflow_workflow_id: params.scanner_workflow_workflow_id.clone(),
                scanner_workflow_run_id: params.scanner_workflow_run_id.clone(),
                starting_shard_id,
            })
            .await?;

        merged.corrupted_keys.extend(page.corrupted_keys);
        merged.min_shard = merge_bound(merged.min_shard, page.min_shard, ShardId::min);
        merged.max_shard = merge_bound(merged.max_shard, page.max_shard, ShardId::max);

        let token = page.shard_query_pagination_token;
        if token.is_done {
            merged.shard_query_pagination_token = ShardQueryPaginationToken {
                next_shard_id: None,
                is_done: true,
            };
            info!(
                entries = merged.corrupted_keys.len(),
                min_shard = ?merged.min_shard,
                max_shard = ?merged.max_shard,
                "corrupted keys lookup complete"
            );
            return Ok(merged);
        }

        starting_shard_id = match token.next_shard_id {
            Some(next) => Some(next),
            None => {
                return Err(
                    ActivityError::new("corrupted keys page missing pagination cursor").into(),
                );
            }
        };
    }
}

fn merge_bound(
    current: Option<ShardId>,
    observed: Option<ShardId>,
    pick: fn(ShardId, ShardId) -> ShardId,
) -> Option<ShardId> {
    match (current, observed) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}
