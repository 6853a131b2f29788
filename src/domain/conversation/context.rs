//! Platform context value object - the natural external key of a conversation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::UserId;

/// Where a conversation lives on the messaging platform.
///
/// `platform` is a lowercase tag (e.g. "slack"), `channel_id` the platform
/// channel, and `thread_ts` the thread anchor within it. The thread anchor
/// is unique within a platform, so platform and thread together with the
/// user id form the natural key conversations are looked up by;
/// `channel_id` is descriptive and not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformContext {
    pub platform: String,
    pub channel_id: String,
    pub thread_ts: String,
}

impl PlatformContext {
    /// Creates a new platform context.
    pub fn new(
        platform: impl Into<String>,
        channel_id: impl Into<String>,
        thread_ts: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            channel_id: channel_id.into(),
            thread_ts: thread_ts.into(),
        }
    }

    /// Returns the cache key for this context and user: `platform:user:thread`.
    pub fn cache_key(&self, user_id: &UserId) -> String {
        format!("{}:{}:{}", self.platform, user_id, self.thread_ts)
    }

    /// Natural-key equality, ignoring the descriptive `channel_id`.
    pub fn same_thread(&self, other: &PlatformContext) -> bool {
        self.platform == other.platform && self.thread_ts == other.thread_ts
    }
}

impl fmt::Display for PlatformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.platform, self.channel_id, self.thread_ts)
    }
}
