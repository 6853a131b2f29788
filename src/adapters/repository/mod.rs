//! Cache-aside repository layer composed over the storage tiers.

mod cached;
mod conversation;

pub use cached::{CacheAside, CacheableEntity};
pub use conversation::CachedConversationRepository;
