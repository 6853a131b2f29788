//! Concrete command, event, and query handlers.
//!
//! Each handler owns exactly one message name and is registered under it in
//! `wiring`. Command handlers load the aggregate, call one mutation, persist,
//! and surface the drained events through their
//! [`CommandOutcome`](crate::application::registry::CommandOutcome).

mod complete_turn;
mod fail_turn;
mod get_conversation;
mod session_history;
mod start_turn;

pub use complete_turn::CompleteConversationTurnHandler;
pub use fail_turn::FailConversationTurnHandler;
pub use get_conversation::GetConversationHandler;
pub use session_history::{PersistSessionHistoryHandler, SalvagePartialSessionHandler};
pub use start_turn::StartConversationTurnHandler;

use crate::domain::foundation::{CoreError, ErrorCode};

/// A handler received a message name the registry should never have routed
/// to it. This is a wiring bug, not a caller error.
pub(crate) fn misrouted(expected: &'static str, got: &str) -> CoreError {
    CoreError::application(
        ErrorCode::InternalError,
        format!("handler for '{}' received '{}'", expected, got),
    )
    .with_detail("expected", expected)
    .with_detail("got", got)
}
