//! Corruption blob store: where scanners persist the keys of the
//! entities they classified, and where fixers read them back.
//!
//! This crate provides:
//!
//! - [`Blobstore`] — the page-store trait, keyed by
//!   `{prefix}/{page}` ([`PageKey`]).
//! - [`MemoryBlobstore`] — in-memory backend behind a `RwLock<HashMap>`.
//! - [`FileBlobstore`] — one file per page beneath a base directory,
//!   written atomically.
//! - [`BlobWriter`] — buffers entity keys and flushes a page whenever
//!   the configured threshold is reached, returning a [`Keys`] pointer.
//! - [`KeysReader`] — streams the pages of a [`Keys`] pointer back.
//!
//! Pages are length-prefixed sequences of postcard-encoded
//! [`EntityKey`](trawl_types::EntityKey) records (see [`page`]).
//! The store is append-only per prefix: no two writers ever share one.

mod error;
mod file;
mod memory;
pub mod page;
mod reader;
mod traits;
mod writer;

pub use error::BlobError;
pub use file::FileBlobstore;
pub use memory::MemoryBlobstore;
pub use reader::KeysReader;
pub use traits::{Blobstore, PageKey};
pub use writer::BlobWriter;

#[cfg(doc)]
use trawl_types::Keys;
