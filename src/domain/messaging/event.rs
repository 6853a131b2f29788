//! Event messages - facts about state changes, with zero-to-many handlers.
//!
//! Every event carries a v4 UUID and a creation timestamp, plus a dispatch
//! mode: queued events are handed to the outbound transport for
//! out-of-process delivery, inline events are drained in-process before the
//! originating `handle` call returns.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::PlatformContext;
use crate::domain::foundation::{ConversationId, EventId, SessionId, Timestamp, UserId};

/// How an event reaches its handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Hand to the outbound transport; a separate consumer delivers it.
    /// This is the default.
    Queued,
    /// Push onto the bus's internal queue and drain before returning.
    Inline,
}

/// A turn was opened on a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurnStarted {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub context: PlatformContext,
    pub user_message: String,
    pub turn_index: usize,
}

/// A turn reached its terminal completed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurnCompleted {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub cost_usd: Option<f64>,
    pub turn_index: usize,
}

/// A turn reached its terminal failed state.
///
/// Carries whatever partial session id was captured before the failure so
/// downstream consumers can still attempt session persistence or cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurnFailed {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub partial_session_id: Option<SessionId>,
    pub error_message: String,
    pub turn_index: usize,
}

/// The closed set of event payloads the core emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum EventPayload {
    #[serde(rename = "conversation.turn_started.v1")]
    ConversationTurnStarted(ConversationTurnStarted),
    #[serde(rename = "conversation.turn_completed.v1")]
    ConversationTurnCompleted(ConversationTurnCompleted),
    #[serde(rename = "conversation.turn_failed.v1")]
    ConversationTurnFailed(ConversationTurnFailed),
}

impl EventPayload {
    /// Returns the registry name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::ConversationTurnStarted(_) => "conversation.turn_started.v1",
            EventPayload::ConversationTurnCompleted(_) => "conversation.turn_completed.v1",
            EventPayload::ConversationTurnFailed(_) => "conversation.turn_failed.v1",
        }
    }

    /// Every event name, for routing and coverage checks.
    pub const ALL_NAMES: [&'static str; 3] = [
        "conversation.turn_started.v1",
        "conversation.turn_completed.v1",
        "conversation.turn_failed.v1",
    ];
}

/// An event instance: identity, creation time, dispatch mode, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub occurred_at: Timestamp,
    pub dispatch: DispatchMode,
    pub payload: EventPayload,
}

impl Event {
    /// Creates a queued event (the default dispatch mode).
    pub fn queued(payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            occurred_at: Timestamp::now(),
            dispatch: DispatchMode::Queued,
            payload,
        }
    }

    /// Creates an inline event, drained in-process before `handle` returns.
    pub fn inline(payload: EventPayload) -> Self {
        Self {
            dispatch: DispatchMode::Inline,
            ..Self::queued(payload)
        }
    }

    /// Returns the registry name for this event.
    pub fn name(&self) -> &'static str {
        self.payload.name()
    }

    /// Returns true when the event is bound for the outbound transport.
    pub fn is_queued(&self) -> bool {
        self.dispatch == DispatchMode::Queued
    }
}
