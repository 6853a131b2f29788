//! Conversation aggregate - the turn-based interaction model.
//!
//! A conversation belongs to one platform user in one platform context
//! (channel + thread) and accumulates turns. Mutations happen only through
//! the aggregate's own methods, each of which appends a domain event to an
//! internal buffer that the caller drains after persisting.

mod aggregate;
mod context;
mod turn;

pub use aggregate::Conversation;
pub use context::PlatformContext;
pub use turn::{ConversationTurn, TurnStatus};
