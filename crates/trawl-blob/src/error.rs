//! Error types for blob store operations.

/// Errors that can occur while reading or writing corruption blobs.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// A page referenced by a [`Keys`](trawl_types::Keys) pointer does
    /// not exist.
    #[error("blob page not found: {key}")]
    PageNotFound {
        /// The rendered page key.
        key: String,
    },

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),

    /// A page ended mid-record.
    #[error("truncated blob page")]
    TruncatedPage,
}
