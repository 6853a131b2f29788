//! Handler for `conversation.get.v1`.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::application::registry::QueryHandler;
use crate::domain::foundation::{CoreError, ErrorCode};
use crate::domain::messaging::Query;
use crate::ports::ConversationRepository;

const NAME: &str = "conversation.get.v1";

/// Returns the conversation for a user and context as a JSON view, or
/// `null` when none exists. Absence is a valid answer, not an error.
pub struct GetConversationHandler {
    repository: Arc<dyn ConversationRepository>,
}

impl GetConversationHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl QueryHandler for GetConversationHandler {
    async fn handle(&self, query: Query) -> Result<JsonValue, CoreError> {
        let Query::GetConversation(query) = query;

        match self
            .repository
            .find_by_user_and_context(&query.user_id, &query.context)
            .await?
        {
            Some(conversation) => serde_json::to_value(&conversation).map_err(|err| {
                CoreError::application(
                    ErrorCode::InternalError,
                    format!("conversation view serialization failed: {}", err),
                )
            }),
            None => Ok(JsonValue::Null),
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
