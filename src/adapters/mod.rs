//! Adapters - implementations of the port interfaces.
//!
//! Each concern gets a production backend and an in-memory double:
//! - `cache` - Redis / in-memory key-value tier
//! - `store` - Postgres / in-memory durable conversation rows
//! - `blob` - filesystem / in-memory session-history payloads
//! - `transport` - Redis pub/sub / in-memory queued-event delivery
//! - `runtime` - HTTP / scripted mock agent runtime
//! - `repository` - the cache-aside layer composed over the tiers

pub mod blob;
pub mod cache;
pub mod repository;
pub mod runtime;
pub mod store;
pub mod transport;
