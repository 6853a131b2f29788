//! Handler for `conversation.start_turn.v1`.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::application::registry::{CommandHandler, CommandOutcome};
use crate::domain::foundation::CoreError;
use crate::domain::messaging::Command;
use crate::ports::ConversationRepository;

use super::misrouted;

const NAME: &str = "conversation.start_turn.v1";

/// Opens a turn on the conversation for the addressed user and context,
/// creating the conversation on first contact.
pub struct StartConversationTurnHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl StartConversationTurnHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CommandHandler for StartConversationTurnHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome, CoreError> {
        let cmd = match command {
            Command::StartConversationTurn(cmd) => cmd,
            other => return Err(misrouted(NAME, other.name())),
        };

        let mut conversation = self
            .repository
            .find_or_create(&cmd.user_id, &cmd.context)
            .await?;
        conversation.start_turn(cmd.message)?;
        self.repository.save(&conversation).await?;

        info!(
            conversation_id = %conversation.id(),
            turn_index = conversation.turn_count() - 1,
            "turn started"
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
