//! The per-shard scan runner.

use std::sync::Arc;

use tracing::{info, warn};
use trawl_blob::{BlobWriter, Blobstore};
use trawl_invariant::{CheckVerdict, EntityStore, InvariantManager};
use trawl_types::{
    ControlFlowFailure, ScanKeys, ScanReport, ScanResult, ScanStats, ShardId,
};

/// Walks one shard's entities and classifies each against the enabled
/// invariants, persisting classified keys to the blob store.
///
/// A scan never fails as a value: any cursor or blob I/O error turns
/// into a [`ControlFlowFailure`] report carrying whatever stats were
/// counted up to that point. Pages flushed before the failure are
/// orphaned but harmless, because no pointer to them is emitted.
pub struct ShardScanner {
    entity_store: Arc<dyn EntityStore>,
    blobstore: Arc<dyn Blobstore>,
    invariants: InvariantManager,
    page_size: usize,
    flush_threshold: usize,
    /// Blob key scope, `{workflowID}/{runID}`.
    key_scope: String,
}

impl ShardScanner {
    /// Create a runner for one activity invocation.
    pub fn new(
        entity_store: Arc<dyn EntityStore>,
        blobstore: Arc<dyn Blobstore>,
        invariants: InvariantManager,
        page_size: usize,
        flush_threshold: usize,
        key_scope: impl Into<String>,
    ) -> Self {
        Self {
            entity_store,
            blobstore,
            invariants,
            page_size,
            flush_threshold,
            key_scope: key_scope.into(),
        }
    }

    /// Scan one shard and produce its report.
    pub async fn scan_shard(&self, shard_id: ShardId) -> ScanReport {
        let mut stats = ScanStats::default();
        match self.scan_inner(shard_id, &mut stats).await {
            Ok(keys) => {
                info!(
                    shard_id,
                    entities = stats.entities_count,
                    corrupted = stats.corrupted_count,
                    check_failed = stats.check_failed_count,
                    "shard scan complete"
                );
                ScanReport {
                    shard_id,
                    stats,
                    result: ScanResult::ShardScanKeys(keys),
                }
            }
            Err(info) => {
                warn!(shard_id, %info, "shard scan aborted");
                ScanReport {
                    shard_id,
                    stats,
                    result: ScanResult::ControlFlowFailure(ControlFlowFailure { info }),
                }
            }
        }
    }

    async fn scan_inner(
        &self,
        shard_id: ShardId,
        stats: &mut ScanStats,
    ) -> Result<ScanKeys, String> {
        let mut corrupt_writer = BlobWriter::new(
            self.blobstore.clone(),
            format!("{}/{}/corrupt", self.key_scope, shard_id),
            self.flush_threshold,
        );
        let mut failed_writer = BlobWriter::new(
            self.blobstore.clone(),
            format!("{}/{}/failed", self.key_scope, shard_id),
            self.flush_threshold,
        );

        let mut page_token = None;
        loop {
            let page = self
                .entity_store
                .list_entities(shard_id, page_token, self.page_size)
                .await
                .map_err(|e| e.to_string())?;

            for entity in page.entities {
                stats.entities_count += 1;
                let check = self.invariants.run_checks(&entity).await;
                match check.verdict {
                    CheckVerdict::Healthy => {}
                    CheckVerdict::Corrupt => {
                        stats.corrupted_count += 1;
                        let invariant = check.invariant_name.unwrap_or_default();
                        *stats.corruption_by_type.entry(invariant).or_insert(0) += 1;
                        corrupt_writer
                            .append(entity.key)
                            .await
                            .map_err(|e| e.to_string())?;
                    }
                    CheckVerdict::CheckFailed => {
                        stats.check_failed_count += 1;
                        failed_writer
                            .append(entity.key)
                            .await
                            .map_err(|e| e.to_string())?;
                    }
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(ScanKeys {
            corrupt: corrupt_writer.finalize().await.map_err(|e| e.to_string())?,
            failed: failed_writer.finalize().await.map_err(|e| e.to_string())?,
        })
    }
}
