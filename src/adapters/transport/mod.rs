//! OutboundTransport adapters - queued-event delivery.

mod in_memory;
mod redis;

pub use in_memory::InMemoryTransport;
pub use self::redis::RedisTransport;
