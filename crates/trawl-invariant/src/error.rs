//! Error types for persistence operations.

use trawl_types::{EntityKey, ShardId};

/// Errors that can occur while reading or updating persisted entities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// The shard's backend could not be reached.
    #[error("shard {shard_id} unavailable: {info}")]
    ShardUnavailable {
        /// The shard whose backend failed.
        shard_id: ShardId,
        /// Backend-provided detail.
        info: String,
    },

    /// The entity to update does not exist.
    #[error("entity {key} not found in shard {shard_id}")]
    NotFound {
        /// The shard that was searched.
        shard_id: ShardId,
        /// The missing entity's key.
        key: EntityKey,
    },

    /// A versioned update lost its compare-and-swap race.
    #[error("version conflict updating {key} in shard {shard_id}")]
    VersionConflict {
        /// The shard holding the entity.
        shard_id: ShardId,
        /// The contended entity's key.
        key: EntityKey,
    },
}
