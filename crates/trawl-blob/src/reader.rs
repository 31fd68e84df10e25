//! Streaming reader for [`Keys`] pointers.

use std::sync::Arc;

use trawl_types::{EntityKey, Keys};

use crate::error::BlobError;
use crate::page;
use crate::traits::{Blobstore, PageKey};

/// Streams the pages of a [`Keys`] pointer back as key batches.
///
/// A referenced page that is missing from the store is an error: the
/// pointer was emitted only after every page it covers was written.
pub struct KeysReader {
    blobstore: Arc<dyn Blobstore>,
    keys: Keys,
    next_page: u64,
    done: bool,
}

impl KeysReader {
    /// Create a reader positioned at the pointer's first page.
    pub fn new(blobstore: Arc<dyn Blobstore>, keys: Keys) -> Self {
        Self {
            next_page: keys.min_page,
            done: false,
            blobstore,
            keys,
        }
    }

    /// Read the next page of keys, or `None` when the pointer is
    /// exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<EntityKey>>, BlobError> {
        if self.done || self.next_page > self.keys.max_page {
            self.done = true;
            return Ok(None);
        }

        let key = PageKey::new(self.keys.uuid.clone(), self.next_page);
        let payload = self
            .blobstore
            .get_page(&key)
            .await?
            .ok_or_else(|| BlobError::PageNotFound {
                key: key.to_string(),
            })?;
        self.next_page += 1;
        Ok(Some(page::decode_page(&payload)?))
    }

    /// Drain every remaining page into one list.
    pub async fn read_all(mut self) -> Result<Vec<EntityKey>, BlobError> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_page().await? {
            all.extend(batch);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlobWriter, MemoryBlobstore};

    async fn write_keys(store: &Arc<MemoryBlobstore>, n: usize, threshold: usize) -> Keys {
        let mut writer = BlobWriter::new(store.clone() as Arc<dyn Blobstore>, "p", threshold);
        for i in 0..n {
            writer.append(EntityKey::new(format!("wf-{i:03}"))).await.unwrap();
        }
        writer.finalize().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_reads_back_what_writer_wrote() {
        let store = Arc::new(MemoryBlobstore::new());
        let pointer = write_keys(&store, 10, 4).await;

        let reader = KeysReader::new(store.clone(), pointer);
        let all = reader.read_all().await.unwrap();
        assert_eq!(all.len(), 10);
        assert_eq!(all[0], EntityKey::from("wf-000"));
        assert_eq!(all[9], EntityKey::from("wf-009"));
    }

    #[tokio::test]
    async fn test_pages_stream_in_order() {
        let store = Arc::new(MemoryBlobstore::new());
        let pointer = write_keys(&store, 10, 4).await;

        let mut reader = KeysReader::new(store.clone(), pointer);
        let sizes: [usize; 3] = [4, 4, 2];
        for expected in sizes {
            assert_eq!(reader.next_page().await.unwrap().unwrap().len(), expected);
        }
        assert!(reader.next_page().await.unwrap().is_none());
        // Exhausted readers stay exhausted.
        assert!(reader.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_page_is_an_error() {
        let store = Arc::new(MemoryBlobstore::new());
        let pointer = Keys {
            uuid: "never-written".to_string(),
            min_page: 0,
            max_page: 0,
        };
        let mut reader = KeysReader::new(store, pointer);
        assert!(matches!(
            reader.next_page().await,
            Err(BlobError::PageNotFound { .. })
        ));
    }
}
