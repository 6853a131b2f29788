//! In-memory transport for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::{Backend, CoreError, ErrorCode, StorageOp};
use crate::ports::{OutboundTransport, QueuedMessage};

/// In-memory [`OutboundTransport`] that records every send.
#[derive(Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<(String, QueuedMessage)>>,
    fail_sends: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(String, QueuedMessage)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of messages sent on a channel.
    pub fn sent_on(&self, channel: &str) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(c, _)| c == channel)
            .count()
    }
}

#[async_trait]
impl OutboundTransport for InMemoryTransport {
    async fn send(&self, channel: &str, message: QueuedMessage) -> Result<(), CoreError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(CoreError::infrastructure(
                ErrorCode::QueueSendFailed,
                Backend::Queue,
                StorageOp::Write,
                "injected send failure",
            )
            .with_detail("channel", channel));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((channel.to_string(), message));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::PlatformContext;
    use crate::domain::foundation::{ConversationId, UserId};
    use crate::domain::messaging::{ConversationTurnStarted, Event, EventPayload};

    fn message() -> QueuedMessage {
        let event = Event::queued(EventPayload::ConversationTurnStarted(
            ConversationTurnStarted {
                conversation_id: ConversationId::new(),
                user_id: UserId::new("U1").unwrap(),
                context: PlatformContext::new("slack", "C1", "17.001"),
                user_message: "hi".to_string(),
                turn_index: 0,
            },
        ));
        QueuedMessage::wrap(&event).unwrap()
    }

    #[tokio::test]
    async fn records_sends_per_channel() {
        let transport = InMemoryTransport::new();
        transport.send("a", message()).await.unwrap();
        transport.send("b", message()).await.unwrap();
        transport.send("a", message()).await.unwrap();

        assert_eq!(transport.sent_on("a"), 2);
        assert_eq!(transport.sent_on("b"), 1);
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn injected_failures_carry_the_channel() {
        let transport = InMemoryTransport::new();
        transport.fail_sends(true);
        let err = transport.send("a", message()).await.unwrap_err();
        assert_eq!(err.detail("channel"), Some("a"));
    }
}
