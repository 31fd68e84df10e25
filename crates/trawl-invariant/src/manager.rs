//! Ordered invariant evaluation.

use std::sync::Arc;

use tracing::debug;
use trawl_types::{CustomScannerConfig, EntityKey, ShardId};

use crate::entity::EntityRecord;
use crate::invariant::{CheckVerdict, FixOutcome, FixResult, Invariant};
use crate::store::EntityStore;

/// Classification of one entity by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerCheckResult {
    /// The combined verdict.
    pub verdict: CheckVerdict,
    /// Which invariant produced the verdict; `None` when healthy.
    pub invariant_name: Option<String>,
    /// Detail from the determining invariant.
    pub info: String,
}

/// Runs an ordered list of invariants against entities.
///
/// Evaluation stops at the first non-healthy verdict, so an entity gets
/// at most one classification and the classification is stable across
/// runs as long as the list order is.
#[derive(Clone)]
pub struct InvariantManager {
    invariants: Vec<Arc<dyn Invariant>>,
}

impl InvariantManager {
    /// Build a manager over the given invariants, in evaluation order.
    pub fn new(invariants: Vec<Arc<dyn Invariant>>) -> Self {
        Self { invariants }
    }

    /// Whether the manager holds no invariants at all.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// The held invariant names, in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.invariants.iter().map(|i| i.name()).collect()
    }

    /// Build a sub-manager holding only the invariants the config maps
    /// to `"true"`, preserving evaluation order.
    pub fn filtered(&self, config: &CustomScannerConfig) -> Self {
        let invariants = self
            .invariants
            .iter()
            .filter(|i| config.get(i.name()).map(String::as_str) == Some("true"))
            .cloned()
            .collect();
        Self { invariants }
    }

    /// Evaluate the invariants in order against one entity.
    pub async fn run_checks(&self, entity: &EntityRecord) -> ManagerCheckResult {
        for invariant in &self.invariants {
            let result = invariant.check(entity).await;
            match result.verdict {
                CheckVerdict::Healthy => continue,
                verdict => {
                    debug!(
                        key = %entity.key,
                        invariant = invariant.name(),
                        ?verdict,
                        "entity classified"
                    );
                    return ManagerCheckResult {
                        verdict,
                        invariant_name: Some(invariant.name().to_string()),
                        info: result.info,
                    };
                }
            }
        }
        ManagerCheckResult {
            verdict: CheckVerdict::Healthy,
            invariant_name: None,
            info: String::new(),
        }
    }

    /// Re-resolve one previously-classified key and repair it if it is
    /// still corrupt.
    ///
    /// - entity gone, or no longer failing any held invariant → `Skipped`
    /// - check cannot run, or the entity cannot be read → `Failed`
    /// - still corrupt → delegate to the determining invariant's repair
    pub async fn run_fixes(
        &self,
        store: &dyn EntityStore,
        shard_id: ShardId,
        key: &EntityKey,
    ) -> FixResult {
        let entity = match store.get_entity(shard_id, key).await {
            Ok(Some(entity)) => entity,
            Ok(None) => return FixResult::skipped("entity no longer exists"),
            Err(e) => return FixResult::failed(e.to_string()),
        };

        let check = self.run_checks(&entity).await;
        match check.verdict {
            CheckVerdict::Healthy => FixResult::skipped("no longer corrupt"),
            CheckVerdict::CheckFailed => FixResult::failed(check.info),
            CheckVerdict::Corrupt => {
                let name = check.invariant_name.as_deref().unwrap_or_default();
                let invariant = self
                    .invariants
                    .iter()
                    .find(|i| i.name() == name)
                    .expect("determining invariant is held");
                let result = invariant.fix(store, shard_id, &entity).await;
                if result.outcome == FixOutcome::Fixed {
                    debug!(key = %entity.key, invariant = name, "entity repaired");
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariant::CheckResult;
    use crate::store::MemoryEntityStore;

    /// Flags entities whose payload contains `"state": "broken"`;
    /// repairs them by rewriting the state to `"ok"`.
    struct BrokenState;

    #[async_trait::async_trait]
    impl Invariant for BrokenState {
        fn name(&self) -> &'static str {
            "broken_state"
        }

        async fn check(&self, entity: &EntityRecord) -> CheckResult {
            if entity.payload["state"] == "broken" {
                CheckResult::corrupt("state is broken")
            } else {
                CheckResult::healthy()
            }
        }

        async fn fix(
            &self,
            store: &dyn EntityStore,
            shard_id: ShardId,
            entity: &EntityRecord,
        ) -> FixResult {
            let mut repaired = entity.clone();
            repaired.payload["state"] = "ok".into();
            match store.update_entity(shard_id, repaired, entity.version).await {
                Ok(()) => FixResult::fixed("state reset"),
                Err(e) => FixResult::failed(e.to_string()),
            }
        }
    }

    /// Always refuses to run.
    struct Unrunnable;

    #[async_trait::async_trait]
    impl Invariant for Unrunnable {
        fn name(&self) -> &'static str {
            "unrunnable"
        }

        async fn check(&self, _entity: &EntityRecord) -> CheckResult {
            CheckResult::check_failed("dependency unavailable")
        }

        async fn fix(
            &self,
            _store: &dyn EntityStore,
            _shard_id: ShardId,
            _entity: &EntityRecord,
        ) -> FixResult {
            FixResult::failed("cannot fix what cannot be checked")
        }
    }

    fn entity(key: &str, state: &str) -> EntityRecord {
        EntityRecord {
            key: EntityKey::from(key),
            version: 1,
            payload: serde_json::json!({ "state": state }),
        }
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        // broken_state runs first and classifies; unrunnable never gets
        // to veto.
        let manager = InvariantManager::new(vec![Arc::new(BrokenState), Arc::new(Unrunnable)]);
        let result = manager.run_checks(&entity("wf-1", "broken")).await;
        assert_eq!(result.verdict, CheckVerdict::Corrupt);
        assert_eq!(result.invariant_name.as_deref(), Some("broken_state"));
    }

    #[tokio::test]
    async fn test_order_determines_classification() {
        let manager = InvariantManager::new(vec![Arc::new(Unrunnable), Arc::new(BrokenState)]);
        let result = manager.run_checks(&entity("wf-1", "broken")).await;
        assert_eq!(result.verdict, CheckVerdict::CheckFailed);
        assert_eq!(result.invariant_name.as_deref(), Some("unrunnable"));
    }

    #[tokio::test]
    async fn test_healthy_entity_passes_all() {
        let manager = InvariantManager::new(vec![Arc::new(BrokenState)]);
        let result = manager.run_checks(&entity("wf-1", "ok")).await;
        assert_eq!(result.verdict, CheckVerdict::Healthy);
        assert_eq!(result.invariant_name, None);
    }

    #[tokio::test]
    async fn test_filtered_drops_disabled() {
        let manager = InvariantManager::new(vec![Arc::new(BrokenState), Arc::new(Unrunnable)]);
        let config: CustomScannerConfig = [
            ("broken_state".to_string(), "true".to_string()),
            ("unrunnable".to_string(), "false".to_string()),
        ]
        .into();
        let filtered = manager.filtered(&config);
        assert_eq!(filtered.names(), vec!["broken_state"]);
    }

    #[tokio::test]
    async fn test_filtered_requires_explicit_enable() {
        let manager = InvariantManager::new(vec![Arc::new(BrokenState)]);
        let filtered = manager.filtered(&CustomScannerConfig::new());
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_run_fixes_repairs_corrupt_entity() {
        let store = MemoryEntityStore::new();
        store.insert_entity(3, entity("wf-1", "broken"));

        let manager = InvariantManager::new(vec![Arc::new(BrokenState)]);
        let result = manager
            .run_fixes(&store, 3, &EntityKey::from("wf-1"))
            .await;
        assert_eq!(result.outcome, FixOutcome::Fixed);

        let repaired = store
            .get_entity(3, &EntityKey::from("wf-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repaired.payload["state"], "ok");
        assert_eq!(repaired.version, 2);
    }

    #[tokio::test]
    async fn test_run_fixes_skips_healthy_entity() {
        let store = MemoryEntityStore::new();
        store.insert_entity(3, entity("wf-1", "ok"));

        let manager = InvariantManager::new(vec![Arc::new(BrokenState)]);
        let result = manager
            .run_fixes(&store, 3, &EntityKey::from("wf-1"))
            .await;
        assert_eq!(result.outcome, FixOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_run_fixes_skips_missing_entity() {
        let store = MemoryEntityStore::new();
        let manager = InvariantManager::new(vec![Arc::new(BrokenState)]);
        let result = manager
            .run_fixes(&store, 3, &EntityKey::from("wf-gone"))
            .await;
        assert_eq!(result.outcome, FixOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_run_fixes_fails_on_unreadable_shard() {
        let store = MemoryEntityStore::new();
        store.insert_entity(3, entity("wf-1", "broken"));
        store.fail_shard(3);

        let manager = InvariantManager::new(vec![Arc::new(BrokenState)]);
        let result = manager
            .run_fixes(&store, 3, &EntityKey::from("wf-1"))
            .await;
        assert_eq!(result.outcome, FixOutcome::Failed);
    }
}
