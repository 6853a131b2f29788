//! In-memory durable store for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::RwLock;

use crate::domain::conversation::{Conversation, PlatformContext};
use crate::domain::foundation::{
    Backend, ConversationId, CoreError, ErrorCode, StorageOp, UserId,
};
use crate::ports::ConversationStore;

/// In-memory [`ConversationStore`] with call counters and failure toggles.
///
/// "Durable" only for a test's lifetime, but it honors the same contract
/// the Postgres adapter does, including natural-key lookups.
#[derive(Default)]
pub struct InMemoryConversationStore {
    rows: RwLock<HashMap<ConversationId, Conversation>>,
    fetch_calls: AtomicU32,
    upsert_calls: AtomicU32,
    fail_fetches: AtomicBool,
    fail_upserts: AtomicBool,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Number of natural-key fetches served.
    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> u32 {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_error() -> CoreError {
        CoreError::infrastructure(
            ErrorCode::StorageError,
            Backend::Database,
            StorageOp::Read,
            "injected database read failure",
        )
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn fetch_by_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<Option<Conversation>, CoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(Self::read_error());
        }
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows
            .values()
            .find(|c| c.platform_user_id() == user_id && c.context().same_thread(context))
            .cloned())
    }

    async fn upsert(&self, conversation: &Conversation) -> Result<(), CoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(CoreError::infrastructure(
                ErrorCode::StorageError,
                Backend::Database,
                StorageOp::Write,
                "injected database write failure",
            ));
        }
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.insert(*conversation.id(), conversation.clone());
        Ok(())
    }

    async fn remove(&self, id: &ConversationId) -> Result<(), CoreError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.remove(id);
        Ok(())
    }

    async fn exists_for_user_and_context(
        &self,
        user_id: &UserId,
        context: &PlatformContext,
    ) -> Result<bool, CoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(Self::read_error());
        }
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows
            .values()
            .any(|c| c.platform_user_id() == user_id && c.context().same_thread(context)))
    }
}
