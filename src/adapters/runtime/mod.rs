//! AgentRuntime adapters.

mod http;
mod mock;

pub use http::HttpAgentRuntime;
pub use mock::MockAgentRuntime;
