//! Redis-backed cache tier for production deployments.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::foundation::{Backend, CoreError, ErrorCode, StorageOp};
use crate::ports::CacheStore;

/// Redis-backed [`CacheStore`].
///
/// Plain GET / SET EX / DEL over a multiplexed connection; the connection
/// clones cheaply per call.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: MultiplexedConnection,
}

impl RedisCacheStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    fn error(op: StorageOp, e: redis::RedisError) -> CoreError {
        CoreError::infrastructure(ErrorCode::StorageError, Backend::Cache, op, e.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| Self::error(StorageOp::Read, e))
    }

    async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl.as_secs())
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(|e| Self::error(StorageOp::Write, e)),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| Self::error(StorageOp::Write, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Self::error(StorageOp::Delete, e))
    }
}
