//! Application layer - the dispatch core and its handlers.

pub mod bus;
pub mod chat;
pub mod handlers;
pub mod registry;
pub mod retry;
pub mod wiring;

pub use bus::{ChannelRoutes, MessageBus};
pub use chat::ChatSessionService;
pub use registry::{
    CommandHandler, CommandOutcome, EventHandler, HandlerRegistry, QueryHandler, RegistryBuilder,
};
pub use retry::{run_with_retries, RetryPolicy};
pub use wiring::{build_bus, build_registry, CoreDependencies};
