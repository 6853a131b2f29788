//! Query messages - read-only intents with exactly one handler each.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::PlatformContext;
use crate::domain::foundation::UserId;

/// Fetches a conversation view by its natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetConversation {
    pub user_id: UserId,
    pub context: PlatformContext,
}

/// The closed set of queries the core answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Query {
    #[serde(rename = "conversation.get.v1")]
    GetConversation(GetConversation),
}

impl Query {
    /// Returns the registry name for this query.
    pub fn name(&self) -> &'static str {
        match self {
            Query::GetConversation(_) => "conversation.get.v1",
        }
    }

    /// Every query name, for registry coverage checks.
    pub const ALL_NAMES: [&'static str; 1] = ["conversation.get.v1"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_matches_serde_tag() {
        let query = Query::GetConversation(GetConversation {
            user_id: UserId::new("U1").unwrap(),
            context: PlatformContext::new("slack", "C1", "17.001"),
        });
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["name"], query.name());
    }
}
