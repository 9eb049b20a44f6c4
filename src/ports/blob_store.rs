//! BlobStore port - content-addressable object storage.

use async_trait::async_trait;

use crate::domain::foundation::PipelineError;

/// Port for uploading generated media and getting back a stable URL.
///
/// Implementations must derive the object key deterministically from the
/// key hint and a hash of the bytes, so a retried upload after a
/// successful-but-unacknowledged store lands on the same object instead of
/// creating a duplicate.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes and returns a fetchable URL.
    ///
    /// `key_hint` scopes the object (e.g. `news/42/illustrate`); the
    /// adapter appends the content hash and extension.
    async fn store(
        &self,
        bytes: &[u8],
        content_type: &str,
        key_hint: &str,
    ) -> Result<String, PipelineError>;
}

/// Derives the deterministic object key shared by all blob adapters:
/// `{key_hint}/{sha256(bytes)}.{ext}`.
pub fn object_key(bytes: &[u8], key_hint: &str, extension: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = hex::encode(Sha256::digest(bytes));
    format!("{}/{}.{}", key_hint.trim_end_matches('/'), hash, extension)
}
