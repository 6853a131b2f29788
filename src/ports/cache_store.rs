//! CacheStore port - the fast key/value tier.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::CoreError;

/// Port for the fast key/value cache.
///
/// The cache is never authoritative: callers must treat every entry as
/// possibly stale or absent and fall back to the durable tier.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a value by key, `None` on miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Writes a value, optionally expiring after `ttl`.
    async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CoreError>;

    /// Deletes a key; deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn CacheStore) {}
    }
}
