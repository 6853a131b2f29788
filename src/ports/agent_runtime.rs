//! AgentRuntime port - the long-lived external runtime behind the bridge.
//!
//! The runtime is a separate process with its own lifecycle: it may be cold,
//! starting, or ready, loses in-memory session state across restarts, and
//! streams message responses as server-sent events.

use async_trait::async_trait;
use futures::Stream;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::pin::Pin;

use crate::domain::foundation::{CoreError, SessionId};

/// Raw response bytes as produced by the runtime, before SSE decoding.
pub type RuntimeByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, CoreError>> + Send>>;

/// Health of the runtime process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ready,
    Starting,
    Unavailable,
}

/// Credentials pushed into the runtime before starting it.
#[derive(Clone)]
pub struct RuntimeCredentials {
    oauth_token: Secret<String>,
}

impl RuntimeCredentials {
    /// Creates credentials from an OAuth token.
    pub fn new(oauth_token: impl Into<String>) -> Self {
        Self {
            oauth_token: Secret::new(oauth_token.into()),
        }
    }

    /// Exposes the token (for pushing into the runtime).
    pub fn oauth_token(&self) -> &str {
        self.oauth_token.expose_secret()
    }
}

impl std::fmt::Debug for RuntimeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeCredentials").finish_non_exhaustive()
    }
}

/// A structured event decoded from the runtime's response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// Runtime lifecycle notices (session init, warnings).
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<SessionId>,
    },
    /// A chunk of assistant output.
    Assistant {
        #[serde(default)]
        text: String,
        #[serde(default)]
        session_id: Option<SessionId>,
    },
    /// The runtime invoked a tool.
    ToolUse {
        name: String,
        #[serde(default)]
        input: JsonValue,
    },
    /// Terminal event: the session the runtime settled on plus cost.
    Result {
        session_id: SessionId,
        #[serde(default)]
        total_cost_usd: Option<f64>,
        #[serde(default)]
        is_error: bool,
    },
}

impl RuntimeEvent {
    /// Returns true for the stream's terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RuntimeEvent::Result { .. })
    }
}

/// Port for the external agent runtime, identified by a stable per-user key.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Probes the runtime's health.
    async fn health(&self) -> Result<RuntimeHealth, CoreError>;

    /// Pushes current credentials into the runtime.
    async fn push_credentials(&self, credentials: &RuntimeCredentials) -> Result<(), CoreError>;

    /// Starts the runtime process. A failure here is fatal for the
    /// invocation that needed it.
    async fn start(&self) -> Result<(), CoreError>;

    /// Pushes a persisted session history into a fresh runtime instance so
    /// a continued session picks up where it left off.
    async fn restore_session(
        &self,
        session_id: &SessionId,
        history: &[u8],
    ) -> Result<(), CoreError>;

    /// Sends a message and returns the raw SSE byte stream of the response.
    async fn send_message(
        &self,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<RuntimeByteStream, CoreError>;

    /// Pulls the persisted transcript of a session out of the runtime,
    /// `None` when the runtime no longer has it.
    async fn export_session(&self, session_id: &SessionId) -> Result<Option<Vec<u8>>, CoreError>;
}
