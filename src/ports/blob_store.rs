//! BlobStore port - the content-addressed tier for large payloads.

use async_trait::async_trait;

use crate::domain::foundation::CoreError;

/// Port for the blob tier holding session-history payloads.
///
/// Payloads here are large and written far less often than conversation
/// metadata, so they get their own tier instead of the cache or the
/// relational store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads a blob by key, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Writes a blob, replacing any existing content under the key.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError>;

    /// Deletes a blob; deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
}
