//! Ports - capability traits the core depends on.
//!
//! Adapters implement these against real backends (Redis, Postgres,
//! filesystem, HTTP) or in-memory for tests. The application layer only
//! ever sees the traits.

mod agent_runtime;
mod blob_store;
mod cache_store;
mod conversation_repository;
mod conversation_store;
mod outbound_transport;

pub use agent_runtime::{
    AgentRuntime, RuntimeByteStream, RuntimeCredentials, RuntimeEvent, RuntimeHealth,
};
pub use blob_store::BlobStore;
pub use cache_store::CacheStore;
pub use conversation_repository::ConversationRepository;
pub use conversation_store::ConversationStore;
pub use outbound_transport::{OutboundTransport, QueuedMessage};
