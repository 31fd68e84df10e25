//! In-memory blob store backend.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::debug;

use crate::error::BlobError;
use crate::traits::{Blobstore, PageKey};

/// In-memory blob store backed by a `RwLock<HashMap>`.
///
/// Useful for testing and for runs that do not need corruption output
/// to survive the process.
#[derive(Default)]
pub struct MemoryBlobstore {
    pages: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobstore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages currently held.
    pub fn page_count(&self) -> usize {
        self.pages.read().expect("lock poisoned").len()
    }
}

#[async_trait::async_trait]
impl Blobstore for MemoryBlobstore {
    async fn put_page(&self, key: &PageKey, data: Bytes) -> Result<(), BlobError> {
        debug!(%key, size = data.len(), "storing blob page in memory");
        let mut map = self.pages.write().expect("lock poisoned");
        map.insert(key.to_string(), data);
        Ok(())
    }

    async fn get_page(&self, key: &PageKey) -> Result<Option<Bytes>, BlobError> {
        let map = self.pages.read().expect("lock poisoned");
        Ok(map.get(&key.to_string()).cloned())
    }

    async fn contains_page(&self, key: &PageKey) -> Result<bool, BlobError> {
        let map = self.pages.read().expect("lock poisoned");
        Ok(map.contains_key(&key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryBlobstore::new();
        let key = PageKey::new("wid/rid/3/corrupt", 0);
        let data = Bytes::from_static(b"page payload");

        store.put_page(&key, data.clone()).await.unwrap();
        assert_eq!(store.get_page(&key).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryBlobstore::new();
        let key = PageKey::new("wid/rid/3/corrupt", 7);
        assert_eq!(store.get_page(&key).await.unwrap(), None);
        assert!(!store.contains_page(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_rewrite_same_key_allowed() {
        let store = MemoryBlobstore::new();
        let key = PageKey::new("wid/rid/3/corrupt", 0);

        store
            .put_page(&key, Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .put_page(&key, Bytes::from_static(b"second"))
            .await
            .unwrap();
        assert_eq!(
            store.get_page(&key).await.unwrap(),
            Some(Bytes::from_static(b"second"))
        );
        assert_eq!(store.page_count(), 1);
    }

    #[tokio::test]
    async fn test_pages_with_same_prefix_are_distinct() {
        let store = MemoryBlobstore::new();
        store
            .put_page(&PageKey::new("p", 0), Bytes::from_static(b"zero"))
            .await
            .unwrap();
        store
            .put_page(&PageKey::new("p", 1), Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert_eq!(store.page_count(), 2);
    }
}
