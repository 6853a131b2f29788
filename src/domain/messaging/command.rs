//! Command messages - imperative intents with exactly one handler each.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::PlatformContext;
use crate::domain::foundation::{SessionId, UserId};

/// Opens a new turn on the conversation addressed by user + platform context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartConversationTurn {
    pub user_id: UserId,
    pub context: PlatformContext,
    /// The user-authored message that starts the turn.
    pub message: String,
}

/// Closes the in-flight turn with the session the runtime settled on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteConversationTurn {
    pub user_id: UserId,
    pub context: PlatformContext,
    pub session_id: SessionId,
    /// Cost reported by the runtime's terminal stream event, in USD.
    pub cost_usd: Option<f64>,
}

/// Marks the in-flight turn as failed, keeping whatever partial session id
/// was captured before the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailConversationTurn {
    pub user_id: UserId,
    pub context: PlatformContext,
    pub partial_session_id: Option<SessionId>,
    pub error_message: String,
}

/// The closed set of commands the core accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Command {
    #[serde(rename = "conversation.start_turn.v1")]
    StartConversationTurn(StartConversationTurn),
    #[serde(rename = "conversation.complete_turn.v1")]
    CompleteConversationTurn(CompleteConversationTurn),
    #[serde(rename = "conversation.fail_turn.v1")]
    FailConversationTurn(FailConversationTurn),
}

impl Command {
    /// Returns the registry name for this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartConversationTurn(_) => "conversation.start_turn.v1",
            Command::CompleteConversationTurn(_) => "conversation.complete_turn.v1",
            Command::FailConversationTurn(_) => "conversation.fail_turn.v1",
        }
    }

    /// Every command name, for registry coverage checks.
    pub const ALL_NAMES: [&'static str; 3] = [
        "conversation.start_turn.v1",
        "conversation.complete_turn.v1",
        "conversation.fail_turn.v1",
    ];
}
