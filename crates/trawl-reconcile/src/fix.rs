//! The per-shard fix runner.

use std::sync::Arc;

use tracing::{info, warn};
use trawl_blob::{BlobWriter, Blobstore, KeysReader};
use trawl_invariant::{EntityStore, FixOutcome, InvariantManager};
use trawl_types::{
    ControlFlowFailure, CorruptedKeysEntry, FixKeys, FixReport, FixResult, FixStats, ShardId,
};

/// Re-resolves the keys a scanner classified corrupt and repairs the
/// entities that still violate their invariant.
///
/// Blob-level errors (a referenced page missing, a classified-keys
/// flush failing) abort the shard with a
/// [`ControlFlowFailure`] report. Per-entity problems (an entity that
/// can no longer be read, a repair that fails) are `Failed`
/// classifications inside a normal report, not shard failures.
pub struct ShardFixer {
    entity_store: Arc<dyn EntityStore>,
    blobstore: Arc<dyn Blobstore>,
    invariants: InvariantManager,
    flush_threshold: usize,
    /// Blob key scope, `{workflowID}/{runID}`.
    key_scope: String,
}

impl ShardFixer {
    /// Create a runner for one activity invocation.
    pub fn new(
        entity_store: Arc<dyn EntityStore>,
        blobstore: Arc<dyn Blobstore>,
        invariants: InvariantManager,
        flush_threshold: usize,
        key_scope: impl Into<String>,
    ) -> Self {
        Self {
            entity_store,
            blobstore,
            invariants,
            flush_threshold,
            key_scope: key_scope.into(),
        }
    }

    /// Fix one shard's corrupted keys and produce its report.
    pub async fn fix_shard(&self, entry: &CorruptedKeysEntry) -> FixReport {
        let shard_id = entry.shard_id;
        let mut stats = FixStats::default();
        match self.fix_inner(entry, &mut stats).await {
            Ok(keys) => {
                info!(
                    shard_id,
                    entities = stats.entities_count,
                    fixed = stats.fixed_count,
                    skipped = stats.skipped_count,
                    failed = stats.failed_count,
                    "shard fix complete"
                );
                FixReport {
                    shard_id,
                    stats,
                    result: FixResult::ShardFixKeys(keys),
                }
            }
            Err(info) => {
                warn!(shard_id, %info, "shard fix aborted");
                FixReport {
                    shard_id,
                    stats,
                    result: FixResult::ControlFlowFailure(ControlFlowFailure { info }),
                }
            }
        }
    }

    async fn fix_inner(
        &self,
        entry: &CorruptedKeysEntry,
        stats: &mut FixStats,
    ) -> Result<FixKeys, String> {
        let shard_id = entry.shard_id;
        let mut fixed_writer = BlobWriter::new(
            self.blobstore.clone(),
            format!("{}/{}/fixed", self.key_scope, shard_id),
            self.flush_threshold,
        );
        let mut skipped_writer = BlobWriter::new(
            self.blobstore.clone(),
            format!("{}/{}/skipped", self.key_scope, shard_id),
            self.flush_threshold,
        );
        let mut failed_writer = BlobWriter::new(
            self.blobstore.clone(),
            format!("{}/{}/failed", self.key_scope, shard_id),
            self.flush_threshold,
        );

        let mut reader = KeysReader::new(self.blobstore.clone(), entry.corrupted_keys.clone());
        while let Some(keys) = reader.next_page().await.map_err(|e| e.to_string())? {
            for key in keys {
                stats.entities_count += 1;
                let result = self
                    .invariants
                    .run_fixes(self.entity_store.as_ref(), shard_id, &key)
                    .await;
                let writer = match result.outcome {
                    FixOutcome::Fixed => {
                        stats.fixed_count += 1;
                        &mut fixed_writer
                    }
                    FixOutcome::Skipped => {
                        stats.skipped_count += 1;
                        &mut skipped_writer
                    }
                    FixOutcome::Failed => {
                        stats.failed_count += 1;
                        &mut failed_writer
                    }
                };
                writer.append(key).await.map_err(|e| e.to_string())?;
            }
        }

        Ok(FixKeys {
            fixed: fixed_writer.finalize().await.map_err(|e| e.to_string())?,
            skipped: skipped_writer.finalize().await.map_err(|e| e.to_string())?,
            failed: failed_writer.finalize().await.map_err(|e| e.to_string())?,
        })
    }
}
