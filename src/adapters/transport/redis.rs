//! Redis pub/sub transport for queued events.
//!
//! Queued messages are serialized to JSON and PUBLISHed on the routed
//! channel; a separate consumer process subscribes and feeds them back
//! into a bus as inbound event messages.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::domain::foundation::{Backend, CoreError, ErrorCode, StorageOp};
use crate::ports::{OutboundTransport, QueuedMessage};

/// Redis-backed [`OutboundTransport`].
#[derive(Clone)]
pub struct RedisTransport {
    conn: MultiplexedConnection,
}

impl RedisTransport {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OutboundTransport for RedisTransport {
    async fn send(&self, channel: &str, message: QueuedMessage) -> Result<(), CoreError> {
        let payload = serde_json::to_string(&message).map_err(|e| {
            CoreError::application(
                ErrorCode::InternalError,
                format!("failed to serialize queued message: {}", e),
            )
        })?;

        let mut conn = self.conn.clone();
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                CoreError::infrastructure(
                    ErrorCode::QueueSendFailed,
                    Backend::Queue,
                    StorageOp::Write,
                    e.to_string(),
                )
                .with_detail("channel", channel)
            })
    }
}
