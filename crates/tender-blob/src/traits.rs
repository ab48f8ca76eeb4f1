//! The `Blob` trait: an abstract key/byte-string store. Keys are
//! forward-slash paths of the form `<category>/<batch_id>/<path>`; the
//! core treats values as opaque and assumes no adapter-specific semantics.

use async_trait::async_trait;

use crate::error::BlobResult;

/// Abstract key→bytes interface. Implementations may be filesystem-backed,
/// object-store-backed, or in-memory; callers never depend on which.
#[async_trait]
pub trait Blob: Send + Sync {
    /// Write `bytes` under `key`, creating any needed intermediate
    /// directories/prefixes. Read-many, write-once per key; a second write
    /// to the same key is undefined and the core never performs one.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> BlobResult<()>;

    /// Read the full contents stored under `key`.
    ///
    /// # Errors
    /// Returns [`crate::error::BlobError::NotFound`] if `key` does not exist.
    async fn get(&self, key: &str) -> BlobResult<Vec<u8>>;

    /// Remove `key`. A no-op if it does not exist.
    async fn delete(&self, key: &str) -> BlobResult<()>;

    /// Whether `key` currently exists.
    async fn exists(&self, key: &str) -> BlobResult<bool>;
}
