//! Core trait and key type for blob page storage.

use std::fmt;

use bytes::Bytes;

use crate::error::BlobError;

/// Address of one blob page: a writer-owned prefix plus a page number.
///
/// Scanner and fixer activities derive the prefix from their workflow
/// identity and classification bucket
/// (`{workflowID}/{runID}/{shardID}/{bucket}`), so no two activities
/// ever write under the same prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    /// The writer-owned key prefix.
    pub prefix: String,
    /// Page number within the prefix.
    pub page: u64,
}

impl PageKey {
    /// Build a key from a prefix and page number.
    pub fn new(prefix: impl Into<String>, page: u64) -> Self {
        Self {
            prefix: prefix.into(),
            page,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.page)
    }
}

/// Trait for storing and retrieving corruption blob pages.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Page payloads are passed as [`Bytes`] so backends can hold them
/// without copying. Re-writing a page under the same key is permitted
/// (activities run at-least-once and may replay their own writes) but
/// distinct writers never share a prefix.
#[async_trait::async_trait]
pub trait Blobstore: Send + Sync {
    /// Store a page under the given key.
    async fn put_page(&self, key: &PageKey, data: Bytes) -> Result<(), BlobError>;

    /// Retrieve a page by key. Returns `None` if not found.
    async fn get_page(&self, key: &PageKey) -> Result<Option<Bytes>, BlobError>;

    /// Check whether a page exists.
    async fn contains_page(&self, key: &PageKey) -> Result<bool, BlobError>;
}
