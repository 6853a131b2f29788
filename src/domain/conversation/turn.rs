//! Conversation turn value object.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, Timestamp};

/// Lifecycle state of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Started,
    Completed,
    Failed,
}

impl TurnStatus {
    /// Returns true for completed or failed turns.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnStatus::Completed | TurnStatus::Failed)
    }
}

/// One user-initiated exchange within a conversation.
///
/// Turns are owned by the `Conversation` aggregate and transition
/// `Started -> Completed` or `Started -> Failed`, never back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The user message that opened the turn.
    pub user_message: String,
    pub status: TurnStatus,
    /// Session the runtime settled on; set on completion (or partially
    /// captured on failure).
    pub session_id: Option<SessionId>,
    /// Runtime-reported cost in USD, if any.
    pub cost_usd: Option<f64>,
    /// Why the turn failed; only set for failed turns.
    pub error_message: Option<String>,
    pub started_at: Timestamp,
}

impl ConversationTurn {
    /// Opens a new turn for the given user message.
    pub fn started(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            status: TurnStatus::Started,
            session_id: None,
            cost_usd: None,
            error_message: None,
            started_at: Timestamp::now(),
        }
    }

    /// Returns true while the turn has not reached a terminal state.
    pub fn is_in_flight(&self) -> bool {
        !self.status.is_terminal()
    }
}
