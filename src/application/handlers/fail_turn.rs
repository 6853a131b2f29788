//! Handler for `conversation.fail_turn.v1`.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::application::registry::{CommandHandler, CommandOutcome};
use crate::domain::foundation::{CoreError, ErrorCode};
use crate::domain::messaging::Command;
use crate::ports::ConversationRepository;

use super::misrouted;

const NAME: &str = "conversation.fail_turn.v1";

/// Marks the in-flight turn as failed, keeping any partial session id so
/// downstream consumers can salvage what the runtime streamed before dying.
pub struct FailConversationTurnHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl FailConversationTurnHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CommandHandler for FailConversationTurnHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome, CoreError> {
        let cmd = match command {
            Command::FailConversationTurn(cmd) => cmd,
            other => return Err(misrouted(NAME, other.name())),
        };

        let mut conversation = self
            .repository
            .find_by_user_and_context(&cmd.user_id, &cmd.context)
            .await?
            .ok_or_else(|| {
                CoreError::domain(
                    ErrorCode::ConversationNotFound,
                    "no conversation for this user and context",
                )
                .with_detail("key", cmd.context.cache_key(&cmd.user_id))
            })?;

        conversation.fail_turn(cmd.partial_session_id.clone(), cmd.error_message.clone())?;
        self.repository.save(&conversation).await?;

        warn!(
            conversation_id = %conversation.id(),
            error = %cmd.error_message,
            partial_session = cmd.partial_session_id.as_ref().map(|s| s.as_str()),
            "turn failed"
        );

        let events = conversation.collect_events();
        Ok(CommandOutcome::new(json!({
            "conversation_id": conversation.id(),
            "turn_index": conversation.turn_count() - 1,
        }))
        .with_events(events))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
