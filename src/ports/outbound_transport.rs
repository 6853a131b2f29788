//! OutboundTransport port - hands queued events to an external consumer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{CoreError, Timestamp};
use crate::domain::messaging::Event;

/// Transport wrapper for a queued event.
///
/// Delivery is at-least-once: consumers must treat the wrapped event id as
/// a deduplication key and keep handlers idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// Wire format version of this wrapper.
    pub version: u32,
    /// When the message was handed to the transport.
    pub queued_at: Timestamp,
    /// The serialized event.
    pub payload: JsonValue,
}

impl QueuedMessage {
    /// Current wire format version.
    pub const VERSION: u32 = 1;

    /// Wraps an event for transport.
    pub fn wrap(event: &Event) -> Result<Self, CoreError> {
        let payload = serde_json::to_value(event).map_err(|e| {
            CoreError::application(
                crate::domain::foundation::ErrorCode::InternalError,
                format!("failed to serialize event '{}': {}", event.name(), e),
            )
        })?;
        Ok(Self {
            version: Self::VERSION,
            queued_at: Timestamp::now(),
            payload,
        })
    }

    /// Deserializes the wrapped event back out.
    pub fn unwrap_event(&self) -> Result<Event, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Port for the outbound async-message transport.
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    /// Sends a wrapped message on a named channel.
    async fn send(&self, channel: &str, message: QueuedMessage) -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::PlatformContext;
    use crate::domain::foundation::{ConversationId, UserId};
    use crate::domain::messaging::{ConversationTurnStarted, EventPayload};

    fn sample_event() -> Event {
        Event::queued(EventPayload::ConversationTurnStarted(
            ConversationTurnStarted {
                conversation_id: ConversationId::new(),
                user_id: UserId::new("U1").unwrap(),
                context: PlatformContext::new("slack", "C1", "17.001"),
                user_message: "hi".to_string(),
                turn_index: 0,
            },
        ))
    }

    #[test]
    fn wrap_carries_version_and_payload() {
        let event = sample_event();
        let message = QueuedMessage::wrap(&event).unwrap();

        assert_eq!(message.version, QueuedMessage::VERSION);
        assert_eq!(
            message.payload["payload"]["name"],
            "conversation.turn_started.v1"
        );
    }

    #[test]
    fn wrapped_event_round_trips() {
        let event = sample_event();
        let message = QueuedMessage::wrap(&event).unwrap();
        let restored = message.unwrap_event().unwrap();
        assert_eq!(restored, event);
    }

    #[test]
    fn outbound_transport_is_object_safe() {
        fn _accepts_dyn(_transport: &dyn OutboundTransport) {}
    }
}
