//! Domain layer - aggregates, value objects, and the message taxonomy.

pub mod conversation;
pub mod foundation;
pub mod messaging;
