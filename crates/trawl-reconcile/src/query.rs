//! The live query surface.
//!
//! Query names are part of the public contract: external callers
//! invoke them by literal name through a workflow's dispatch entry
//! point. Payloads travel as JSON, matching how the engine hands query
//! arguments to a running workflow.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use trawl_types::{PaginatedShardQueryRequest, ShardId, ShardQueryPaginationToken};

/// Query name: the running aggregate.
pub const AGGREGATE_REPORT_QUERY: &str = "aggregate_report";
/// Query name: one shard's report, takes a shard ID argument.
pub const SHARD_REPORT_QUERY: &str = "shard_report";
/// Query name: paginated per-shard statuses.
pub const SHARD_STATUS_QUERY: &str = "shard_status";
/// Query name: paginated corrupted-key pointers.
pub const SHARD_CORRUPT_KEYS_QUERY: &str = "shard_corrupt_keys";

/// Largest page a shard-keyed query will return.
pub const MAX_SHARD_QUERY_RESULT: usize = 1000;

/// Errors returned by the query dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The query name is not part of this workflow's surface.
    #[error("unknown query: {0}")]
    UnknownQuery(String),

    /// The arguments did not deserialize to the query's input type.
    #[error("invalid query arguments: {0}")]
    InvalidArguments(String),

    /// The result failed to serialize.
    #[error("failed to encode query result: {0}")]
    ResultEncoding(String),
}

/// Deserialize query arguments, treating absent/null as the default.
pub(crate) fn parse_args<T: DeserializeOwned + Default>(args: Value) -> Result<T, QueryError> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| QueryError::InvalidArguments(e.to_string()))
}

/// Serialize a query result back to JSON.
pub(crate) fn encode_result<T: serde::Serialize>(result: &T) -> Result<Value, QueryError> {
    serde_json::to_value(result).map_err(|e| QueryError::ResultEncoding(e.to_string()))
}

/// Cut one page out of a shard-keyed map.
///
/// The window is `[start, start + limit)` where `start` defaults to the
/// smallest tracked shard and `limit` to [`MAX_SHARD_QUERY_RESULT`].
/// The returned token carries `next_shard_id == start + limit` whenever
/// a tracked shard at or beyond that bound exists, and `is_done`
/// otherwise.
pub(crate) fn paginate<V: Clone>(
    entries: &BTreeMap<ShardId, V>,
    request: &PaginatedShardQueryRequest,
) -> (BTreeMap<ShardId, V>, ShardQueryPaginationToken) {
    let start = request
        .starting_shard_id
        .or_else(|| entries.keys().next().copied())
        .unwrap_or(0);
    let limit = request
        .limit_shards
        .unwrap_or(MAX_SHARD_QUERY_RESULT)
        .max(1);
    // u64 so `start + limit` cannot wrap.
    let end = start as u64 + limit as u64;

    let window: BTreeMap<ShardId, V> = entries
        .range(start..)
        .take_while(|(&id, _)| (id as u64) < end)
        .map(|(&id, v)| (id, v.clone()))
        .collect();

    let more_remain = entries
        .keys()
        .next_back()
        .is_some_and(|&max| (max as u64) >= end);

    let token = if more_remain {
        ShardQueryPaginationToken {
            next_shard_id: Some(end as ShardId),
            is_done: false,
        }
    } else {
        ShardQueryPaginationToken {
            next_shard_id: None,
            is_done: true,
        }
    };

    (window, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(ids: &[ShardId]) -> BTreeMap<ShardId, ShardId> {
        ids.iter().map(|&id| (id, id)).collect()
    }

    fn request(start: Option<ShardId>, limit: Option<usize>) -> PaginatedShardQueryRequest {
        PaginatedShardQueryRequest {
            starting_shard_id: start,
            limit_shards: limit,
        }
    }

    #[test]
    fn test_window_is_half_open() {
        let map = entries(&(0..30).collect::<Vec<_>>());
        let (window, token) = paginate(&map, &request(Some(5), Some(10)));
        assert_eq!(window.keys().copied().collect::<Vec<_>>(), (5..15).collect::<Vec<_>>());
        assert_eq!(token.next_shard_id, Some(15));
        assert!(!token.is_done);
    }

    #[test]
    fn test_defaults_cover_everything() {
        let map = entries(&(0..30).collect::<Vec<_>>());
        let (window, token) = paginate(&map, &PaginatedShardQueryRequest::default());
        assert_eq!(window.len(), 30);
        assert!(token.is_done);
        assert_eq!(token.next_shard_id, None);
    }

    #[test]
    fn test_sparse_shards_keep_token_arithmetic() {
        // Tracked shards are sparse; the bound is still start + limit.
        let map = entries(&[1, 5, 10, 11, 12, 20, 41]);
        let (window, token) = paginate(&map, &request(Some(1), Some(10)));
        assert_eq!(window.keys().copied().collect::<Vec<_>>(), vec![1, 5, 10]);
        assert_eq!(token.next_shard_id, Some(11));
        assert!(!token.is_done);
    }

    #[test]
    fn test_last_page_is_done() {
        let map = entries(&[1, 5, 10]);
        let (window, token) = paginate(&map, &request(Some(5), Some(10)));
        assert_eq!(window.keys().copied().collect::<Vec<_>>(), vec![5, 10]);
        assert!(token.is_done);
        assert_eq!(token.next_shard_id, None);
    }

    #[test]
    fn test_empty_map() {
        let map: BTreeMap<ShardId, ShardId> = BTreeMap::new();
        let (window, token) = paginate(&map, &PaginatedShardQueryRequest::default());
        assert!(window.is_empty());
        assert!(token.is_done);
    }

    #[test]
    fn test_window_past_everything() {
        let map = entries(&[1, 2, 3]);
        let (window, token) = paginate(&map, &request(Some(50), Some(10)));
        assert!(window.is_empty());
        assert!(token.is_done);
    }
}
