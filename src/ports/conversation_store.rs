//! ConversationStore port - the durable relational tier.

use async_trait::async_trait;

use crate::domain::conversation::{Conversation, PlatformContext};
use crate::domain::foundation::{ConversationId, CoreError, UserId};

/// Port for the authoritative conversation store.
///
/// Implementations own the row mapping (how an aggregate becomes rows and
/// back); the aggregate itself knows nothing about storage. Reads go
/// through the natural key (platform + user + thread).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Point lookup by the natural key.
    async fn fetch_by_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<Option<Conversation>, CoreError>;

    /// Inserts or fully replaces the conversation and its turns.
    async fn upsert(&self, conversation: &Conversation) -> Result<(), CoreError>;

    /// Removes the conversation and its turns.
    async fn remove(&self, id: &ConversationId) -> Result<(), CoreError>;

    /// Returns true when a conversation exists for the natural key.
    async fn exists_for_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<bool, CoreError>;
}
