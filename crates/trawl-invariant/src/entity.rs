//! Persisted entity representation.

use serde::{Deserialize, Serialize};
use trawl_types::EntityKey;

/// One persisted entity as the reconciliation core sees it.
///
/// The payload is opaque to the core: invariants interpret it, nothing
/// else does. `version` backs the persistence layer's compare-and-swap
/// update path, so a fix that raced a concurrent writer is rejected
/// instead of clobbering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// The entity's identifier within its shard.
    pub key: EntityKey,
    /// Persistence version, bumped on every update.
    pub version: u64,
    /// The entity's state, interpreted only by invariants.
    pub payload: serde_json::Value,
}

/// One page of a shard's entity cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPage {
    /// The entities in this page, in cursor order.
    pub entities: Vec<EntityRecord>,
    /// Opaque continuation token; `None` means the cursor is exhausted.
    pub next_page_token: Option<String>,
}
