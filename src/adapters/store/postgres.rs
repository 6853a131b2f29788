//! PostgreSQL implementation of ConversationStore.
//!
//! A conversation maps to one `conversations` row plus one
//! `conversation_turns` row per turn. Upsert replaces the turn rows
//! wholesale inside a transaction; turns are append-only and few per
//! conversation, so the rewrite is cheaper than diffing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::conversation::{Conversation, ConversationTurn, PlatformContext, TurnStatus};
use crate::domain::foundation::{
    Backend, ConversationId, CoreError, ErrorCode, SessionId, StorageOp, Timestamp, UserId,
};
use crate::ports::ConversationStore;

/// PostgreSQL-backed [`ConversationStore`].
#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn error(op: StorageOp, message: impl Into<String>) -> CoreError {
        CoreError::infrastructure(ErrorCode::StorageError, Backend::Database, op, message)
    }

    async fn load_turns(&self, id: &ConversationId) -> Result<Vec<ConversationTurn>, CoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_message, status, session_id, cost_usd, error_message, started_at
            FROM conversation_turns
            WHERE conversation_id = $1
            ORDER BY turn_index
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::error(StorageOp::Read, format!("failed to load turns: {}", e)))?;

        rows.iter().map(row_to_turn).collect()
    }

    async fn load_conversation(
        &self,
        row: sqlx::postgres::PgRow,
    ) -> Result<Conversation, CoreError> {
        let id = ConversationId::from_uuid(row.get::<Uuid, _>("id"));
        let turns = self.load_turns(&id).await?;

        let user_id = UserId::new(row.get::<String, _>("platform_user_id"))?;
        let context = PlatformContext::new(
            row.get::<String, _>("platform"),
            row.get::<String, _>("channel_id"),
            row.get::<String, _>("thread_ts"),
        );
        let latest_session_id = row
            .get::<Option<String>, _>("latest_session_id")
            .map(SessionId::new)
            .transpose()?;

        Ok(Conversation::reconstitute(
            id,
            user_id,
            context,
            latest_session_id,
            turns,
            Timestamp::from_datetime(row.get::<DateTime<Utc>, _>("created_at")),
            Timestamp::from_datetime(row.get::<DateTime<Utc>, _>("updated_at")),
        ))
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn fetch_by_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<Option<Conversation>, CoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, platform_user_id, platform, channel_id, thread_ts,
                   latest_session_id, created_at, updated_at
            FROM conversations
            WHERE platform_user_id = $1 AND platform = $2 AND thread_ts = $3
            "#,
        )
        .bind(user_id.as_str())
        .bind(&context.platform)
        .bind(&context.thread_ts)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Self::error(StorageOp::Read, format!("failed to fetch conversation: {}", e))
        })?;

        match row {
            Some(row) => Ok(Some(self.load_conversation(row).await?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, conversation: &Conversation) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Self::error(StorageOp::Write, format!("failed to start transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO conversations (
                id, platform_user_id, platform, channel_id, thread_ts,
                latest_session_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                latest_session_id = EXCLUDED.latest_session_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(conversation.platform_user_id().as_str())
        .bind(&conversation.context().platform)
        .bind(&conversation.context().channel_id)
        .bind(&conversation.context().thread_ts)
        .bind(conversation.latest_session_id().map(SessionId::as_str))
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Self::error(StorageOp::Write, format!("failed to upsert conversation: {}", e))
        })?;

        // Turns are replaced wholesale; see module docs.
        sqlx::query("DELETE FROM conversation_turns WHERE conversation_id = $1")
            .bind(conversation.id().as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Self::error(StorageOp::Write, format!("failed to clear turns: {}", e))
            })?;

        for (index, turn) in conversation.turns().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO conversation_turns (
                    conversation_id, turn_index, user_message, status,
                    session_id, cost_usd, error_message, started_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(conversation.id().as_uuid())
            .bind(index as i32)
            .bind(&turn.user_message)
            .bind(turn_status_to_str(turn.status))
            .bind(turn.session_id.as_ref().map(SessionId::as_str))
            .bind(turn.cost_usd)
            .bind(turn.error_message.as_deref())
            .bind(turn.started_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Self::error(StorageOp::Write, format!("failed to insert turn: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Self::error(StorageOp::Write, format!("failed to commit transaction: {}", e))
        })
    }

    async fn remove(&self, id: &ConversationId) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Self::error(StorageOp::Delete, format!("failed to start transaction: {}", e))
        })?;

        sqlx::query("DELETE FROM conversation_turns WHERE conversation_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Self::error(StorageOp::Delete, format!("failed to delete turns: {}", e))
            })?;

        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Self::error(StorageOp::Delete, format!("failed to delete conversation: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            Self::error(StorageOp::Delete, format!("failed to commit transaction: {}", e))
        })
    }

    async fn exists_for_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<bool, CoreError> {
        let row = sqlx::query(
            r#"
            SELECT 1 AS one
            FROM conversations
            WHERE platform_user_id = $1 AND platform = $2 AND thread_ts = $3
            "#,
        )
        .bind(user_id.as_str())
        .bind(&context.platform)
        .bind(&context.thread_ts)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Self::error(StorageOp::Read, format!("failed to check existence: {}", e))
        })?;

        Ok(row.is_some())
    }
}

fn turn_status_to_str(status: TurnStatus) -> &'static str {
    match status {
        TurnStatus::Started => "started",
        TurnStatus::Completed => "completed",
        TurnStatus::Failed => "failed",
    }
}

fn turn_status_from_str(s: &str) -> Result<TurnStatus, CoreError> {
    match s {
        "started" => Ok(TurnStatus::Started),
        "completed" => Ok(TurnStatus::Completed),
        "failed" => Ok(TurnStatus::Failed),
        other => Err(CoreError::infrastructure(
            ErrorCode::StorageError,
            Backend::Database,
            StorageOp::Read,
            format!("unknown turn status '{}'", other),
        )),
    }
}

fn row_to_turn(row: &sqlx::postgres::PgRow) -> Result<ConversationTurn, CoreError> {
    Ok(ConversationTurn {
        user_message: row.get::<String, _>("user_message"),
        status: turn_status_from_str(&row.get::<String, _>("status"))?,
        session_id: row
            .get::<Option<String>, _>("session_id")
            .map(SessionId::new)
            .transpose()?,
        cost_usd: row.get::<Option<f64>, _>("cost_usd"),
        error_message: row.get::<Option<String>, _>("error_message"),
        started_at: Timestamp::from_datetime(row.get::<DateTime<Utc>, _>("started_at")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_status_round_trips_through_strings() {
        for status in [TurnStatus::Started, TurnStatus::Completed, TurnStatus::Failed] {
            let restored = turn_status_from_str(turn_status_to_str(status)).unwrap();
            assert_eq!(restored, status);
        }
    }

    #[test]
    fn unknown_turn_status_is_a_storage_error() {
        let err = turn_status_from_str("archived").unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageError);
    }
}
