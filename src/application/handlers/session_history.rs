//! Event handlers that move session transcripts out of the runtime and
//! into the blob tier.
//!
//! The runtime keeps transcripts only as long as its process lives, so the
//! core exports them on every terminal turn: completed turns always, failed
//! turns when a partial session id was captured.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::registry::EventHandler;
use crate::domain::foundation::{CoreError, SessionId, UserId};
use crate::domain::messaging::{Event, EventPayload};
use crate::ports::{AgentRuntime, ConversationRepository};

/// Exports and persists the transcript of every completed turn.
pub struct PersistSessionHistoryHandler {
    runtime: Arc<dyn AgentRuntime>,
    repository: Arc<dyn ConversationRepository>,
}

impl PersistSessionHistoryHandler {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        repository: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            runtime,
            repository,
        }
    }
}

#[async_trait]
impl EventHandler for PersistSessionHistoryHandler {
    async fn handle(&self, event: &Event) -> Result<(), CoreError> {
        let completed = match &event.payload {
            EventPayload::ConversationTurnCompleted(completed) => completed,
            _ => return Ok(()),
        };

        export_and_persist(
            self.runtime.as_ref(),
            self.repository.as_ref(),
            &completed.user_id,
            &completed.session_id,
        )
        .await
    }

    fn name(&self) -> &'static str {
        "persist_session_history"
    }
}

/// Salvages whatever transcript exists for a failed turn's partial session.
pub struct SalvagePartialSessionHandler {
    runtime: Arc<dyn AgentRuntime>,
    repository: Arc<dyn ConversationRepository>,
}

impl SalvagePartialSessionHandler {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        repository: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            runtime,
            repository,
        }
    }
}

#[async_trait]
impl EventHandler for SalvagePartialSessionHandler {
    async fn handle(&self, event: &Event) -> Result<(), CoreError> {
        let failed = match &event.payload {
            EventPayload::ConversationTurnFailed(failed) => failed,
            _ => return Ok(()),
        };

        let Some(session_id) = &failed.partial_session_id else {
            debug!(
                conversation_id = %failed.conversation_id,
                "failed turn carried no partial session, nothing to salvage"
            );
            return Ok(());
        };

        export_and_persist(
            self.runtime.as_ref(),
            self.repository.as_ref(),
            &failed.user_id,
            session_id,
        )
        .await
    }

    fn name(&self) -> &'static str {
        "salvage_partial_session"
    }
}

async fn export_and_persist(
    runtime: &dyn AgentRuntime,
    repository: &dyn ConversationRepository,
    user_id: &UserId,
    session_id: &SessionId,
) -> Result<(), CoreError> {
    match runtime.export_session(session_id).await? {
        Some(history) => {
            repository
                .save_session_history(user_id, session_id, &history, None)
                .await?;
            info!(
                session_id = session_id.as_str(),
                bytes = history.len(),
                "session history persisted"
            );
            Ok(())
        }
        None => {
            debug!(
                session_id = session_id.as_str(),
                "runtime no longer has the session, skipping persistence"
            );
            Ok(())
        }
    }
}
