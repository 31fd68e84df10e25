//! Persistence interface and in-memory backend.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::RwLock;

use trawl_types::{EntityKey, ShardId};

use crate::entity::{EntityPage, EntityRecord};
use crate::error::PersistenceError;

/// The persistence layer as the reconciliation core consumes it.
///
/// Scans only read (the paginated cursor); fixes read and write, with
/// writes going through per-entity versioned compare-and-swap.
#[async_trait::async_trait]
pub trait EntityStore: Send + Sync {
    /// Read one page of a shard's entities, in stable cursor order.
    async fn list_entities(
        &self,
        shard_id: ShardId,
        page_token: Option<String>,
        page_size: usize,
    ) -> Result<EntityPage, PersistenceError>;

    /// Resolve one entity by key. Returns `None` if it does not exist.
    async fn get_entity(
        &self,
        shard_id: ShardId,
        key: &EntityKey,
    ) -> Result<Option<EntityRecord>, PersistenceError>;

    /// Replace an entity, succeeding only if its stored version still
    /// equals `expected_version`. The stored version is bumped on
    /// success.
    async fn update_entity(
        &self,
        shard_id: ShardId,
        record: EntityRecord,
        expected_version: u64,
    ) -> Result<(), PersistenceError>;
}

/// In-memory entity store: per-shard ordered maps behind a `RwLock`.
///
/// Shards can be marked failed ([`fail_shard`](Self::fail_shard)) so
/// callers can exercise their control-flow-failure paths.
#[derive(Default)]
pub struct MemoryEntityStore {
    shards: RwLock<BTreeMap<ShardId, BTreeMap<EntityKey, EntityRecord>>>,
    failed: RwLock<BTreeSet<ShardId>>,
}

impl MemoryEntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an entity in a shard.
    pub fn insert_entity(&self, shard_id: ShardId, record: EntityRecord) {
        let mut shards = self.shards.write().expect("lock poisoned");
        shards
            .entry(shard_id)
            .or_default()
            .insert(record.key.clone(), record);
    }

    /// Number of entities currently held by a shard.
    pub fn entity_count(&self, shard_id: ShardId) -> usize {
        let shards = self.shards.read().expect("lock poisoned");
        shards.get(&shard_id).map_or(0, BTreeMap::len)
    }

    /// Make every operation against the shard fail.
    pub fn fail_shard(&self, shard_id: ShardId) {
        self.failed.write().expect("lock poisoned").insert(shard_id);
    }

    /// Undo [`fail_shard`](Self::fail_shard).
    pub fn restore_shard(&self, shard_id: ShardId) {
        self.failed.write().expect("lock poisoned").remove(&shard_id);
    }

    fn check_available(&self, shard_id: ShardId) -> Result<(), PersistenceError> {
        if self.failed.read().expect("lock poisoned").contains(&shard_id) {
            return Err(PersistenceError::ShardUnavailable {
                shard_id,
                info: "injected fault".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EntityStore for MemoryEntityStore {
    async fn list_entities(
        &self,
        shard_id: ShardId,
        page_token: Option<String>,
        page_size: usize,
    ) -> Result<EntityPage, PersistenceError> {
        self.check_available(shard_id)?;
        let shards = self.shards.read().expect("lock poisoned");
        let Some(shard) = shards.get(&shard_id) else {
            return Ok(EntityPage::default());
        };

        let start = match page_token {
            Some(token) => Bound::Excluded(EntityKey(token)),
            None => Bound::Unbounded,
        };
        let page_size = page_size.max(1);

        let entities: Vec<EntityRecord> = shard
            .range((start, Bound::Unbounded))
            .take(page_size)
            .map(|(_, record)| record.clone())
            .collect();

        let next_page_token = match entities.last() {
            Some(last)
                if shard
                    .range((Bound::Excluded(last.key.clone()), Bound::Unbounded))
                    .next()
                    .is_some() =>
            {
                Some(last.key.0.clone())
            }
            _ => None,
        };

        Ok(EntityPage {
            entities,
            next_page_token,
        })
    }

    async fn get_entity(
        &self,
        shard_id: ShardId,
        key: &EntityKey,
    ) -> Result<Option<EntityRecord>, PersistenceError> {
        self.check_available(shard_id)?;
        let shards = self.shards.read().expect("lock poisoned");
        Ok(shards.get(&shard_id).and_then(|s| s.get(key)).cloned())
    }

    async fn update_entity(
        &self,
        shard_id: ShardId,
        record: EntityRecord,
        expected_version: u64,
    ) -> Result<(), PersistenceError> {
        self.check_available(shard_id)?;
        let mut shards = self.shards.write().expect("lock poisoned");
        let Some(existing) = shards.get_mut(&shard_id).and_then(|s| s.get_mut(&record.key))
        else {
            return Err(PersistenceError::NotFound {
                shard_id,
                key: record.key,
            });
        };

        if existing.version != expected_version {
            return Err(PersistenceError::VersionConflict {
                shard_id,
                key: record.key,
            });
        }

        *existing = EntityRecord {
            version: expected_version + 1,
            ..record
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, version: u64) -> EntityRecord {
        EntityRecord {
            key: EntityKey::from(key),
            version,
            payload: serde_json::json!({ "state": "ok" }),
        }
    }

    #[tokio::test]
    async fn test_cursor_pages_in_key_order() {
        let store = MemoryEntityStore::new();
        for i in 0..7 {
            store.insert_entity(1, record(&format!("wf-{i}"), 1));
        }

        let page1 = store.list_entities(1, None, 3).await.unwrap();
        assert_eq!(page1.entities.len(), 3);
        assert_eq!(page1.entities[0].key, EntityKey::from("wf-0"));
        let token = page1.next_page_token.clone().unwrap();

        let page2 = store.list_entities(1, Some(token), 3).await.unwrap();
        assert_eq!(page2.entities[0].key, EntityKey::from("wf-3"));
        let token = page2.next_page_token.clone().unwrap();

        let page3 = store.list_entities(1, Some(token), 3).await.unwrap();
        assert_eq!(page3.entities.len(), 1);
        assert_eq!(page3.next_page_token, None);
    }

    #[tokio::test]
    async fn test_exact_page_boundary_ends_cursor() {
        let store = MemoryEntityStore::new();
        for i in 0..4 {
            store.insert_entity(1, record(&format!("wf-{i}"), 1));
        }
        let page = store.list_entities(1, None, 4).await.unwrap();
        assert_eq!(page.entities.len(), 4);
        assert_eq!(page.next_page_token, None);
    }

    #[tokio::test]
    async fn test_unknown_shard_is_empty() {
        let store = MemoryEntityStore::new();
        let page = store.list_entities(99, None, 10).await.unwrap();
        assert!(page.entities.is_empty());
        assert_eq!(page.next_page_token, None);
    }

    #[tokio::test]
    async fn test_failed_shard_errors() {
        let store = MemoryEntityStore::new();
        store.insert_entity(1, record("wf-0", 1));
        store.fail_shard(1);

        assert!(matches!(
            store.list_entities(1, None, 10).await,
            Err(PersistenceError::ShardUnavailable { shard_id: 1, .. })
        ));
        assert!(store.get_entity(1, &EntityKey::from("wf-0")).await.is_err());

        store.restore_shard(1);
        assert!(store.list_entities(1, None, 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_cas_update_bumps_version() {
        let store = MemoryEntityStore::new();
        store.insert_entity(1, record("wf-0", 1));

        let mut updated = record("wf-0", 1);
        updated.payload = serde_json::json!({ "state": "repaired" });
        store.update_entity(1, updated, 1).await.unwrap();

        let stored = store
            .get_entity(1, &EntityKey::from("wf-0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.payload["state"], "repaired");
    }

    #[tokio::test]
    async fn test_cas_update_rejects_stale_version() {
        let store = MemoryEntityStore::new();
        store.insert_entity(1, record("wf-0", 5));

        let result = store.update_entity(1, record("wf-0", 5), 4).await;
        assert!(matches!(
            result,
            Err(PersistenceError::VersionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_cas_update_missing_entity() {
        let store = MemoryEntityStore::new();
        let result = store.update_entity(1, record("wf-0", 1), 1).await;
        assert!(matches!(result, Err(PersistenceError::NotFound { .. })));
    }
}
