//! CacheStore adapters.

mod in_memory;
mod redis;

pub use in_memory::InMemoryCacheStore;
pub use self::redis::RedisCacheStore;
