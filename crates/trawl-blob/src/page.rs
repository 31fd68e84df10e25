//! Blob page codec.
//!
//! A page is a flat sequence of records, each a `u32` little-endian
//! length prefix followed by that many bytes of postcard-encoded
//! [`EntityKey`]. The length prefix lets a reader walk a page without
//! knowing how many records it holds, and makes truncation detectable.

use bytes::{BufMut, Bytes, BytesMut};
use trawl_types::EntityKey;

use crate::error::BlobError;

/// Length of each record's length prefix.
const LEN_PREFIX: usize = 4;

/// Encode a batch of entity keys into one page payload.
pub fn encode_page(keys: &[EntityKey]) -> Result<Bytes, BlobError> {
    let mut buf = BytesMut::new();
    for key in keys {
        let record = postcard::to_allocvec(key)?;
        buf.put_u32_le(record.len() as u32);
        buf.put_slice(&record);
    }
    Ok(buf.freeze())
}

/// Decode a page payload back into entity keys.
///
/// Rejects pages that end mid-record.
pub fn decode_page(data: &[u8]) -> Result<Vec<EntityKey>, BlobError> {
    let mut keys = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        if rest.len() < LEN_PREFIX {
            return Err(BlobError::TruncatedPage);
        }
        let len = u32::from_le_bytes(rest[..LEN_PREFIX].try_into().expect("4 bytes")) as usize;
        rest = &rest[LEN_PREFIX..];

        if rest.len() < len {
            return Err(BlobError::TruncatedPage);
        }
        keys.push(postcard::from_bytes(&rest[..len])?);
        rest = &rest[len..];
    }

    Ok(keys)
}
