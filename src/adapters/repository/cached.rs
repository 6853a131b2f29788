//! Generic cache-aside base over a fast tier and a durable loader.
//!
//! The durable tier is authoritative. A corrupt cache entry degrades to a
//! miss and is evicted; a cache read I/O error is a real storage failure
//! and propagates. Cache writes and invalidations after a successful
//! durable operation are best-effort. Negative results are never cached,
//! so a conversation created by another process is visible on the next
//! read.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::foundation::{CoreError, ErrorCode};
use crate::ports::CacheStore;

/// An entity that can live in the cache tier.
pub trait CacheableEntity: Serialize + DeserializeOwned + Send + Sync {
    /// Entity name used in normalized storage errors.
    const ENTITY: &'static str;

    fn to_cache_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| {
            CoreError::application(
                ErrorCode::InternalError,
                format!("failed to serialize {} for cache: {}", Self::ENTITY, e),
            )
        })
    }

    fn from_cache_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| {
            CoreError::application(
                ErrorCode::InternalError,
                format!("corrupt cached {}: {}", Self::ENTITY, e),
            )
        })
    }
}

/// Cache-aside operations for one entity type.
///
/// Concrete repositories compose this with their durable tier: they pass
/// the durable operation as a closure and this base decides when the cache
/// is consulted, backfilled, or invalidated.
pub struct CacheAside<E> {
    cache: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: CacheableEntity> CacheAside<E> {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Option<Duration>) -> Self {
        Self {
            cache,
            ttl,
            _entity: PhantomData,
        }
    }

    /// Reads through the cache, falling back to the durable loader on a
    /// miss and backfilling on a durable hit.
    ///
    /// # Errors
    ///
    /// A cache read I/O error or a durable loader failure propagates,
    /// normalized to a `StorageError` tagged with the entity and key.
    /// A corrupt cache entry is not an I/O error and degrades to a miss.
    pub async fn find_with_cache<F, Fut>(&self, key: &str, load: F) -> Result<Option<E>, CoreError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<E>, CoreError>> + Send,
    {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match E::from_cache_bytes(&bytes) {
                Ok(entity) => {
                    debug!(entity = E::ENTITY, key, "cache hit");
                    return Ok(Some(entity));
                }
                Err(err) => {
                    // Corrupt entry: treat as a miss and evict it.
                    warn!(%err, entity = E::ENTITY, key, "evicting corrupt cache entry");
                    if let Err(err) = self.cache.delete(key).await {
                        warn!(%err, key, "failed to evict corrupt cache entry");
                    }
                }
            },
            Ok(None) => {}
            Err(err) => return Err(normalize(err, E::ENTITY, key)),
        }

        let loaded = load().await.map_err(|err| normalize(err, E::ENTITY, key))?;

        if let Some(entity) = &loaded {
            self.backfill(key, entity).await;
        }
        Ok(loaded)
    }

    /// Persists durably first, then best-effort refreshes the cache.
    pub async fn save<F, Fut>(&self, key: &str, entity: &E, persist: F) -> Result<(), CoreError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<(), CoreError>> + Send,
    {
        persist()
            .await
            .map_err(|err| normalize(err, E::ENTITY, key))?;
        self.backfill(key, entity).await;
        Ok(())
    }

    /// Removes durably first, then best-effort invalidates the cache.
    pub async fn delete<F, Fut>(&self, key: &str, remove: F) -> Result<(), CoreError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<(), CoreError>> + Send,
    {
        remove()
            .await
            .map_err(|err| normalize(err, E::ENTITY, key))?;
        if let Err(err) = self.cache.delete(key).await {
            warn!(%err, entity = E::ENTITY, key, "cache invalidation failed");
        }
        Ok(())
    }

    /// Existence check; a live cache entry answers without the durable tier.
    pub async fn exists<F, Fut>(&self, key: &str, check: F) -> Result<bool, CoreError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<bool, CoreError>> + Send,
    {
        match self.cache.get(key).await {
            Ok(Some(_)) => return Ok(true),
            Ok(None) => {}
            Err(err) => return Err(normalize(err, E::ENTITY, key)),
        }
        check().await.map_err(|err| normalize(err, E::ENTITY, key))
    }

    async fn backfill(&self, key: &str, entity: &E) {
        let bytes = match entity.to_cache_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, entity = E::ENTITY, key, "cache serialization failed");
                return;
            }
        };
        if let Err(err) = self.cache.put(key, &bytes, self.ttl).await {
            warn!(%err, entity = E::ENTITY, key, "cache backfill failed");
        }
    }
}

/// Normalizes a storage-tier failure into the repository's storage error,
/// preserving the original backend and operation tags.
fn normalize(err: CoreError, entity: &str, key: &str) -> CoreError {
    let mut err = err;
    if err.is_infrastructure() {
        err.code = ErrorCode::StorageError;
    }
    err.with_detail("entity", entity).with_detail("key", key)
}
