//! File-based blob store backend.
//!
//! Stores one file per page; the page key maps directly onto the
//! directory layout, so a page written under
//! `{workflowID}/{runID}/{shardID}/{bucket}/{page}` lands at exactly
//! that path beneath the base directory.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::BlobError;
use crate::traits::{Blobstore, PageKey};

/// File-based blob store.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place. This prevents a crashed activity from leaving a
/// half-written page that a later fixer would misread.
pub struct FileBlobstore {
    base_dir: PathBuf,
}

impl FileBlobstore {
    /// Create a new store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, BlobError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn page_path(&self, key: &PageKey) -> PathBuf {
        self.base_dir
            .join(&key.prefix)
            .join(key.page.to_string())
    }
}

#[async_trait::async_trait]
impl Blobstore for FileBlobstore {
    async fn put_page(&self, key: &PageKey, data: Bytes) -> Result<(), BlobError> {
        let path = self.page_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(%key, path = %path.display(), size = data.len(), "stored blob page to file");
        Ok(())
    }

    async fn get_page(&self, key: &PageKey) -> Result<Option<Bytes>, BlobError> {
        let path = self.page_path(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn contains_page(&self, key: &PageKey) -> Result<bool, BlobError> {
        let path = self.page_path(key);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobstore::new(dir.path()).unwrap();
        let key = PageKey::new("wid/rid/3/corrupt", 0);
        let data = Bytes::from_static(b"page payload");

        store.put_page(&key, data.clone()).await.unwrap();
        assert_eq!(store.get_page(&key).await.unwrap(), Some(data));
        assert!(store.contains_page(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobstore::new(dir.path()).unwrap();
        let key = PageKey::new("wid/rid/3/corrupt", 42);
        assert_eq!(store.get_page(&key).await.unwrap(), None);
        assert!(!store.contains_page(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobstore::new(dir.path()).unwrap();
        let key = PageKey::new("p", 0);

        store
            .put_page(&key, Bytes::from_static(b"payload"))
            .await
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("p"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["0".to_string()]);
    }

    #[tokio::test]
    async fn test_key_layout_maps_to_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobstore::new(dir.path()).unwrap();
        let key = PageKey::new("wid/rid/7/fixed", 3);

        store
            .put_page(&key, Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(dir.path().join("wid/rid/7/fixed/3").is_file());
    }
}
