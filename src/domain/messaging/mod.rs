//! Message taxonomy - the closed set of intents the dispatch core routes.
//!
//! Three kinds exist: commands (imperative, exactly one handler), events
//! (factual, zero-to-many handlers), and queries (read-only, exactly one
//! handler). Each kind is a closed sum type; `name()` is an exhaustive
//! match over every variant, so adding a message forces every dispatch
//! site to account for it.

mod command;
mod event;
mod query;

pub use command::{
    Command, CompleteConversationTurn, FailConversationTurn, StartConversationTurn,
};
pub use event::{
    ConversationTurnCompleted, ConversationTurnFailed, ConversationTurnStarted, DispatchMode,
    Event, EventPayload,
};
pub use query::{GetConversation, Query};

use serde::{Deserialize, Serialize};

/// The three message kinds the bus distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Command,
    Event,
    Query,
}

/// Any message the bus can handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Command(Command),
    Event(Event),
    Query(Query),
}

impl Message {
    /// Returns the registry name of the wrapped message.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Command(command) => command.name(),
            Message::Event(event) => event.name(),
            Message::Query(query) => query.name(),
        }
    }

    /// Returns which kind of message this is.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Command(_) => MessageKind::Command,
            Message::Event(_) => MessageKind::Event,
            Message::Query(_) => MessageKind::Query,
        }
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Message::Event(event)
    }
}

impl From<Query> for Message {
    fn from(query: Query) -> Self {
        Message::Query(query)
    }
}
