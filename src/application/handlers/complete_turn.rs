//! Handler for `conversation.complete_turn.v1`.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::application::registry::{CommandHandler, CommandOutcome};
use crate::domain::foundation::{CoreError, ErrorCode};
use crate::domain::messaging::Command;
use crate::ports::ConversationRepository;

use super::misrouted;

const NAME: &str = "conversation.complete_turn.v1";

/// Closes the in-flight turn with the session the runtime settled on.
pub struct CompleteConversationTurnHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl CompleteConversationTurnHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CommandHandler for CompleteConversationTurnHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome, CoreError> {
        let cmd = match command {
            Command::CompleteConversationTurn(cmd) => cmd,
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

        conversation.complete_turn(cmd.session_id.clone(), cmd.cost_usd)?;
        self.repository.save(&conversation).await?;

        info!(
            conversation_id = %conversation.id(),
            session_id = cmd.session_id.as_str(),
            cost_usd = cmd.cost_usd,
            "turn completed"
        );

        let events = conversation.collect_events();
        Ok(CommandOutcome::new(json!({
            "conversation_id": conversation.id(),
            "session_id": cmd.session_id,
            "turn_index": conversation.turn_count() - 1,
        }))
        .with_events(events))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
