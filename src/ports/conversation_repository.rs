//! ConversationRepository port - aggregate persistence across all tiers.
//!
//! The repository fronts three storage tiers: the fast cache (keyed by
//! `platform:user:thread`), the durable relational store (keyed by
//! conversation id), and the blob tier for session-history payloads.

use async_trait::async_trait;

use crate::domain::conversation::{Conversation, PlatformContext};
use crate::domain::foundation::{CoreError, SessionId, UserId};

/// Repository port for Conversation aggregate persistence.
///
/// Implementations must keep the durable tier authoritative: cache and blob
/// failures after a successful durable write are tolerated, durable failures
/// are not.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Finds a conversation by its natural key.
    ///
    /// Returns `None` when no conversation exists for the key.
    async fn find_by_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<Option<Conversation>, CoreError>;

    /// Finds the conversation for the natural key, or constructs a fresh
    /// unsaved one. The caller must `save` after mutating.
    async fn find_or_create(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<Conversation, CoreError> {
        match self.find_by_user_and_context(user_id, context).await? {
            Some(conversation) => Ok(conversation),
            None => Ok(Conversation::start_new(user_id.clone(), context.clone())),
        }
    }

    /// Persists the conversation: durable write first, then best-effort
    /// cache update.
    async fn save(&self, conversation: &Conversation) -> Result<(), CoreError>;

    /// Deletes the conversation from the durable store (must succeed) and
    /// best-effort from the cache.
    async fn delete(&self, conversation: &Conversation) -> Result<(), CoreError>;

    /// Returns true when a conversation exists for the natural key. A cache
    /// hit answers without touching the durable tier.
    async fn exists(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<bool, CoreError>;

    /// Persists a session-history payload to the blob tier.
    async fn save_session_history(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        history: &[u8],
        project_id: Option<&str>,
    ) -> Result<(), CoreError>;

    /// Reads a session-history payload, `None` when absent.
    async fn get_session_history(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<Vec<u8>>, CoreError>;

    /// Deletes a session-history payload.
    async fn delete_session_history(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<(), CoreError>;
}
