//! Cache-aside ConversationRepository over the three storage tiers.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::adapters::repository::cached::{CacheAside, CacheableEntity};
use crate::domain::conversation::{Conversation, PlatformContext};
use crate::domain::foundation::{CoreError, SessionId, UserId};
use crate::ports::{BlobStore, CacheStore, ConversationRepository, ConversationStore};

impl CacheableEntity for Conversation {
    const ENTITY: &'static str = "Conversation";
}

/// [`ConversationRepository`] composed from the cache, durable, and blob
/// tiers. Conversation metadata lives cache-aside over the durable store;
/// session-history payloads go straight to the blob tier.
pub struct CachedConversationRepository {
    aside: CacheAside<Conversation>,
    store: Arc<dyn ConversationStore>,
    blob: Arc<dyn BlobStore>,
}

impl CachedConversationRepository {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn ConversationStore>,
        blob: Arc<dyn BlobStore>,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            aside: CacheAside::new(cache, cache_ttl),
            store,
            blob,
        }
    }

    fn history_key(user_id: &UserId, session_id: &SessionId) -> String {
        format!("sessions/{}/{}.jsonl", user_id, session_id)
    }
}

#[async_trait]
impl ConversationRepository for CachedConversationRepository {
    async fn find_by_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<Option<Conversation>, CoreError> {
        let key = context.cache_key(user_id);
        self.aside
            .find_with_cache(&key, || {
                self.store.fetch_by_user_and_context(user_id, context)
            })
            .await
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), CoreError> {
        let key = conversation
            .context()
            .cache_key(conversation.platform_user_id());
        self.aside
            .save(&key, conversation, || self.store.upsert(conversation))
            .await
    }

    async fn delete(&self, conversation: &Conversation) -> Result<(), CoreError> {
        let key = conversation
            .context()
            .cache_key(conversation.platform_user_id());
        self.aside
            .delete(&key, || self.store.remove(conversation.id()))
            .await
    }

    async fn exists(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<bool, CoreError> {
        let key = context.cache_key(user_id);
        self.aside
            .exists(&key, || {
                self.store.exists_for_user_and_context(user_id, context)
            })
            .await
    }

    async fn save_session_history(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        history: &[u8],
        project_id: Option<&str>,
    ) -> Result<(), CoreError> {
        // The key is user + session; project scoping stays with the caller.
        if let Some(project_id) = project_id {
            debug!(project_id, session_id = session_id.as_str(), "saving session history");
        }
        self.blob
            .put(&Self::history_key(user_id, session_id), history)
            .await
    }

    async fn get_session_history(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<Vec<u8>>, CoreError> {
        self.blob
            .get(&Self::history_key(user_id, session_id))
            .await
    }

    async fn delete_session_history(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<(), CoreError> {
        self.blob
            .delete(&Self::history_key(user_id, session_id))
            .await
    }
}
