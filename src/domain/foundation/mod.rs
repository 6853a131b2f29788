//! Foundation module - Shared domain primitives.
//!
//! Contains the identifier value objects, timestamp, and error types
//! that form the vocabulary of the dispatch core.

mod errors;
mod ids;
mod timestamp;

pub use errors::{Backend, CoreError, ErrorCode, ErrorKind, StorageOp};
pub use ids::{ConversationId, EventId, SessionId, UserId};
pub use timestamp::Timestamp;
