//! Handler registry - static maps from message name to handler.
//!
//! The registry is assembled once at process start by an explicit
//! registration pass (see `wiring`) and immutable afterwards. Commands and
//! queries have exactly one handler each and an unregistered name is a
//! fail-loud application error; events have zero-to-many handlers and an
//! unregistered name is a silent no-op.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{CoreError, ErrorCode};
use crate::domain::messaging::{Command, Event, Query};

/// What a command handler produces: a result value for the caller plus the
/// events the command raised.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub result: JsonValue,
    pub events: Vec<Event>,
}

impl CommandOutcome {
    /// Creates an outcome with no events.
    pub fn new(result: JsonValue) -> Self {
        Self {
            result,
            events: Vec::new(),
        }
    }

    /// Builder: attach the events the command raised.
    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }
}

/// Handles exactly one command name.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: Command) -> Result<CommandOutcome, CoreError>;
    fn name(&self) -> &'static str;
}

/// Handles an event; may share the event name with other handlers.
///
/// Event handlers return no events: they cannot enqueue further messages.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<(), CoreError>;
    fn name(&self) -> &'static str;
}

/// Handles exactly one query name.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn handle(&self, query: Query) -> Result<JsonValue, CoreError>;
    fn name(&self) -> &'static str;
}

/// Immutable lookup structure from message name to handler(s).
pub struct HandlerRegistry {
    commands: HashMap<&'static str, Arc<dyn CommandHandler>>,
    events: HashMap<&'static str, Vec<Arc<dyn EventHandler>>>,
    queries: HashMap<&'static str, Arc<dyn QueryHandler>>,
}

impl HandlerRegistry {
    /// Looks up the single handler for a command name.
    ///
    /// # Errors
    ///
    /// - `UnregisteredCommand` when no handler was registered - a wiring
    ///   bug that must surface, not be swallowed
    pub fn command_handler(&self, name: &str) -> Result<Arc<dyn CommandHandler>, CoreError> {
        self.commands.get(name).cloned().ok_or_else(|| {
            CoreError::application(
                ErrorCode::UnregisteredCommand,
                format!("no handler registered for command '{}'", name),
            )
            .with_detail("name", name)
        })
    }

    /// Looks up the handlers for an event name.
    ///
    /// An unregistered event name yields an empty list: events are allowed
    /// zero subscribers.
    pub fn event_handlers(&self, name: &str) -> &[Arc<dyn EventHandler>] {
        self.events.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Looks up the single handler for a query name.
    ///
    /// # Errors
    ///
    /// - `UnregisteredQuery` when no handler was registered
    pub fn query_handler(&self, name: &str) -> Result<Arc<dyn QueryHandler>, CoreError> {
        self.queries.get(name).cloned().ok_or_else(|| {
            CoreError::application(
                ErrorCode::UnregisteredQuery,
                format!("no handler registered for query '{}'", name),
            )
            .with_detail("name", name)
        })
    }
}

/// Builds a `HandlerRegistry` during the startup registration pass.
#[derive(Default)]
pub struct RegistryBuilder {
    commands: HashMap<&'static str, Arc<dyn CommandHandler>>,
    events: HashMap<&'static str, Vec<Arc<dyn EventHandler>>>,
    queries: HashMap<&'static str, Arc<dyn QueryHandler>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the single handler for a command name.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate command name - registration happens once at
    /// process start, so a duplicate is a programming error.
    pub fn command(mut self, name: &'static str, handler: Arc<dyn CommandHandler>) -> Self {
        let previous = self.commands.insert(name, handler);
        assert!(previous.is_none(), "duplicate command handler for '{name}'");
        self
    }

    /// Registers an additional handler for an event name.
    pub fn event(mut self, name: &'static str, handler: Arc<dyn EventHandler>) -> Self {
        self.events.entry(name).or_default().push(handler);
        self
    }

    /// Registers the single handler for a query name.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate query name.
    pub fn query(mut self, name: &'static str, handler: Arc<dyn QueryHandler>) -> Self {
        let previous = self.queries.insert(name, handler);
        assert!(previous.is_none(), "duplicate query handler for '{name}'");
        self
    }

    /// Finalizes the immutable registry.
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            commands: self.commands,
            events: self.events,
            queries: self.queries,
        }
    }
}
