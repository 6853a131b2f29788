//! ConversationStore adapters - the durable relational tier.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryConversationStore;
pub use postgres::PostgresConversationStore;
