//! Buffered page writer.

use std::sync::Arc;

use tracing::debug;
use trawl_types::{EntityKey, Keys};

use crate::error::BlobError;
use crate::page;
use crate::traits::{Blobstore, PageKey};

/// Buffers entity keys for one (prefix, bucket) and writes a page each
/// time the flush threshold is reached.
///
/// Pages are numbered from zero. [`finalize`](Self::finalize) flushes
/// whatever remains buffered and returns the [`Keys`] pointer covering
/// everything written, or `None` if no key was ever appended; callers
/// map that to an absent bucket in the shard report.
///
/// A writer abandoned mid-shard (the shard hit a control-flow failure)
/// may leave pages behind; they are orphaned but harmless, because no
/// pointer to them is ever emitted.
pub struct BlobWriter {
    blobstore: Arc<dyn Blobstore>,
    prefix: String,
    flush_threshold: usize,
    buffer: Vec<EntityKey>,
    next_page: u64,
}

impl BlobWriter {
    /// Create a writer for the given prefix.
    ///
    /// `flush_threshold` is clamped to at least one entry per page.
    pub fn new(
        blobstore: Arc<dyn Blobstore>,
        prefix: impl Into<String>,
        flush_threshold: usize,
    ) -> Self {
        Self {
            blobstore,
            prefix: prefix.into(),
            flush_threshold: flush_threshold.max(1),
            buffer: Vec::new(),
            next_page: 0,
        }
    }

    /// Append one key, flushing a page if the threshold is reached.
    pub async fn append(&mut self, key: EntityKey) -> Result<(), BlobError> {
        self.buffer.push(key);
        if self.buffer.len() >= self.flush_threshold {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), BlobError> {
        let payload = page::encode_page(&self.buffer)?;
        let key = PageKey::new(self.prefix.clone(), self.next_page);
        self.blobstore.put_page(&key, payload).await?;
        debug!(%key, entries = self.buffer.len(), "flushed blob page");
        self.buffer.clear();
        self.next_page += 1;
        Ok(())
    }

    /// Flush the remainder and return the pointer to everything written.
    pub async fn finalize(mut self) -> Result<Option<Keys>, BlobError> {
        if !self.buffer.is_empty() {
            self.flush().await?;
        }
        if self.next_page == 0 {
            return Ok(None);
        }
        Ok(Some(Keys {
            uuid: self.prefix,
            min_page: 0,
            max_page: self.next_page - 1,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlobstore;

    fn keys(n: usize) -> Vec<EntityKey> {
        (0..n).map(|i| EntityKey::new(format!("wf-{i:03}"))).collect()
    }

    #[tokio::test]
    async fn test_empty_writer_finalizes_to_none() {
        let store = Arc::new(MemoryBlobstore::new());
        let writer = BlobWriter::new(store.clone(), "p", 10);
        assert_eq!(writer.finalize().await.unwrap(), None);
        assert_eq!(store.page_count(), 0);
    }

    #[tokio::test]
    async fn test_single_partial_page() {
        let store = Arc::new(MemoryBlobstore::new());
        let mut writer = BlobWriter::new(store.clone(), "p", 10);
        for key in keys(3) {
            writer.append(key).await.unwrap();
        }
        let pointer = writer.finalize().await.unwrap().unwrap();
        assert_eq!(
            pointer,
            Keys {
                uuid: "p".to_string(),
                min_page: 0,
                max_page: 0,
            }
        );
        assert_eq!(store.page_count(), 1);
    }

    #[tokio::test]
    async fn test_threshold_splits_pages() {
        let store = Arc::new(MemoryBlobstore::new());
        let mut writer = BlobWriter::new(store.clone(), "p", 4);
        for key in keys(10) {
            writer.append(key).await.unwrap();
        }
        // 4 + 4 flushed, 2 on finalize.
        let pointer = writer.finalize().await.unwrap().unwrap();
        assert_eq!(pointer.min_page, 0);
        assert_eq!(pointer.max_page, 2);
        assert_eq!(store.page_count(), 3);

        let page0 = store.get_page(&PageKey::new("p", 0)).await.unwrap().unwrap();
        assert_eq!(page::decode_page(&page0).unwrap().len(), 4);
        let page2 = store.get_page(&PageKey::new("p", 2)).await.unwrap().unwrap();
        assert_eq!(page::decode_page(&page2).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_exact_multiple_leaves_no_trailing_page() {
        let store = Arc::new(MemoryBlobstore::new());
        let mut writer = BlobWriter::new(store.clone(), "p", 5);
        for key in keys(10) {
            writer.append(key).await.unwrap();
        }
        let pointer = writer.finalize().await.unwrap().unwrap();
        assert_eq!(pointer.max_page, 1);
        assert_eq!(store.page_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_threshold_clamped() {
        let store = Arc::new(MemoryBlobstore::new());
        let mut writer = BlobWriter::new(store.clone(), "p", 0);
        writer.append(EntityKey::from("wf-a")).await.unwrap();
        let pointer = writer.finalize().await.unwrap().unwrap();
        assert_eq!(pointer.max_page, 0);
    }
}
