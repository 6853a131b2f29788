//! In-process message bus.
//!
//! A single `handle` call drains a FIFO work queue seeded with the inbound
//! message. Command and query failures propagate to the caller; event
//! handler failures are retried and then swallowed so one bad subscriber
//! cannot poison the dispatch. Queued events leave the process through the
//! outbound transport, inline events are appended to the work queue and
//! drained before `handle` returns.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::application::registry::HandlerRegistry;
use crate::application::retry::{run_with_retries, RetryPolicy};
use crate::domain::messaging::{Event, Message};
use crate::domain::foundation::CoreError;
use crate::ports::{OutboundTransport, QueuedMessage};

static DEFAULT_ROUTES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("conversation.turn_started.v1", "conversation-events"),
        ("conversation.turn_completed.v1", "conversation-events"),
        ("conversation.turn_failed.v1", "conversation-events"),
    ])
});

/// Maps event names to outbound transport channels.
#[derive(Debug, Clone)]
pub struct ChannelRoutes {
    routes: HashMap<&'static str, &'static str>,
    fallback: &'static str,
}

impl ChannelRoutes {
    pub fn new(routes: HashMap<&'static str, &'static str>, fallback: &'static str) -> Self {
        Self { routes, fallback }
    }

    /// Returns the channel a queued event with this name is published to.
    pub fn channel_for(&self, event_name: &str) -> &'static str {
        self.routes.get(event_name).copied().unwrap_or(self.fallback)
    }
}

impl Default for ChannelRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTES.clone(), "domain-events")
    }
}

/// Dispatches commands, events, and queries to registered handlers.
pub struct MessageBus {
    registry: Arc<HandlerRegistry>,
    transport: Arc<dyn OutboundTransport>,
    routes: ChannelRoutes,
    retry: RetryPolicy,
}

impl MessageBus {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        transport: Arc<dyn OutboundTransport>,
        routes: ChannelRoutes,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            transport,
            routes,
            retry,
        }
    }

    /// Processes one inbound message and everything it spawns inline.
    ///
    /// Returns the command handler's result payload for commands, the query
    /// result for queries, and `null` for bare events. Queries return
    /// immediately and never enqueue follow-up work.
    #[instrument(skip(self, message), fields(message = message.name()))]
    pub async fn handle(&self, message: Message) -> Result<JsonValue, CoreError> {
        let message = match message {
            Message::Query(query) => {
                let handler = self.registry.query_handler(query.name())?;
                return handler.handle(query).await;
            }
            other => other,
        };

        let mut queue: VecDeque<Message> = VecDeque::from([message]);
        let mut result = JsonValue::Null;

        while let Some(next) = queue.pop_front() {
            match next {
                Message::Command(command) => {
                    let handler = self.registry.command_handler(command.name())?;
                    let outcome = handler.handle(command).await?;
                    result = outcome.result;
                    for event in outcome.events {
                        self.route_event(event, &mut queue).await?;
                    }
                }
                Message::Event(event) => {
                    self.dispatch_event(&event).await;
                }
                Message::Query(query) => {
                    // Unreachable today: handlers emit events, not queries.
                    let handler = self.registry.query_handler(query.name())?;
                    result = handler.handle(query).await?;
                }
            }
        }

        Ok(result)
    }

    /// Sends a queued event over the transport, or enqueues an inline one.
    async fn route_event(
        &self,
        event: Event,
        queue: &mut VecDeque<Message>,
    ) -> Result<(), CoreError> {
        if event.is_queued() {
            let channel = self.routes.channel_for(event.name());
            debug!(event = event.name(), channel, "publishing queued event");
            let message = QueuedMessage::wrap(&event)?;
            self.transport.send(channel, message).await
        } else {
            debug!(event = event.name(), "enqueueing inline event");
            queue.push_back(Message::Event(event));
            Ok(())
        }
    }

    /// Invokes every subscriber for the event, retrying each independently.
    async fn dispatch_event(&self, event: &Event) {
        let handlers = self.registry.event_handlers(event.name());
        if handlers.is_empty() {
            debug!(event = event.name(), "no subscribers for event");
            return;
        }
        for handler in handlers {
            let description = format!("{} <- {}", handler.name(), event.name());
            run_with_retries(&self.retry, &description, || handler.handle(event)).await;
        }
    }
}
