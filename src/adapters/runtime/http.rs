//! HTTP adapter for the external agent runtime.
//!
//! One adapter instance talks to one runtime process, addressed by base URL
//! and a stable user key sent on every request. The runtime may be down
//! entirely; only `health` treats an unreachable process as a state rather
//! than an error.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::domain::foundation::{Backend, CoreError, ErrorCode, SessionId, StorageOp};
use crate::ports::{AgentRuntime, RuntimeByteStream, RuntimeCredentials, RuntimeHealth};

const USER_KEY_HEADER: &str = "x-runtime-user-key";

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// HTTP-backed [`AgentRuntime`].
#[derive(Clone)]
pub struct HttpAgentRuntime {
    client: Client,
    base_url: String,
    user_key: String,
}

impl HttpAgentRuntime {
    /// Creates an adapter for the runtime at `base_url`, acting for the
    /// user identified by `user_key`.
    pub fn new(base_url: impl Into<String>, user_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, user_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_key: user_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_error(code: ErrorCode, message: impl Into<String>) -> CoreError {
        CoreError::infrastructure(code, Backend::Runtime, StorageOp::Write, message)
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
    async fn health(&self) -> Result<RuntimeHealth, CoreError> {
        let response = self
            .client
            .get(self.url("/health"))
            .header(USER_KEY_HEADER, &self.user_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        // An unreachable runtime is a health state, not a failure.
        let response = match response {
            Ok(response) => response,
            Err(_) => return Ok(RuntimeHealth::Unavailable),
        };

        if !response.status().is_success() {
            return Ok(RuntimeHealth::Unavailable);
        }

        let body: HealthBody = response.json().await.map_err(|e| {
            Self::request_error(
                ErrorCode::RuntimeRequestFailed,
                format!("malformed health response: {}", e),
            )
        })?;

        Ok(match body.status.as_str() {
            "ready" => RuntimeHealth::Ready,
            "starting" => RuntimeHealth::Starting,
            _ => RuntimeHealth::Unavailable,
        })
    }

    async fn push_credentials(&self, credentials: &RuntimeCredentials) -> Result<(), CoreError> {
        let response = self
            .client
            .post(self.url("/credentials"))
            .header(USER_KEY_HEADER, &self.user_key)
            .json(&json!({ "oauth_token": credentials.oauth_token() }))
            .send()
            .await
            .map_err(|e| {
                Self::request_error(ErrorCode::RuntimeUnavailable, e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(Self::request_error(
                ErrorCode::RuntimeRequestFailed,
                format!("credential push rejected with {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn start(&self) -> Result<(), CoreError> {
        let response = self
            .client
            .post(self.url("/start"))
            .header(USER_KEY_HEADER, &self.user_key)
            .send()
            .await
            .map_err(|e| Self::request_error(ErrorCode::RuntimeStartFailed, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::request_error(
                ErrorCode::RuntimeStartFailed,
                format!("runtime start rejected with {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn restore_session(
        &self,
        session_id: &SessionId,
        history: &[u8],
    ) -> Result<(), CoreError> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{}/restore", session_id)))
            .header(USER_KEY_HEADER, &self.user_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(history.to_vec())
            .send()
            .await
            .map_err(|e| Self::request_error(ErrorCode::RuntimeRequestFailed, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::request_error(
                ErrorCode::RuntimeRequestFailed,
                format!("session restore rejected with {}", response.status()),
            )
            .with_detail("session_id", session_id.as_str()));
        }
        Ok(())
    }

    async fn send_message(
        &self,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<RuntimeByteStream, CoreError> {
        let response = self
            .client
            .post(self.url("/messages"))
            .header(USER_KEY_HEADER, &self.user_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&json!({
                "text": text,
                "session_id": session_id.map(SessionId::as_str),
            }))
            .send()
            .await
            .map_err(|e| Self::request_error(ErrorCode::RuntimeUnavailable, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::request_error(
                ErrorCode::RuntimeRequestFailed,
                format!("message send rejected with {}", response.status()),
            ));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map(|bytes| bytes.to_vec()).map_err(|e| {
                CoreError::infrastructure(
                    ErrorCode::RuntimeRequestFailed,
                    Backend::Runtime,
                    StorageOp::Read,
                    format!("response stream broke: {}", e),
                )
            })
        });
        Ok(Box::pin(stream))
    }

    async fn export_session(&self, session_id: &SessionId) -> Result<Option<Vec<u8>>, CoreError> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{}/export", session_id)))
            .header(USER_KEY_HEADER, &self.user_key)
            .send()
            .await
            .map_err(|e| Self::request_error(ErrorCode::RuntimeRequestFailed, e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::request_error(
                ErrorCode::RuntimeRequestFailed,
                format!("session export rejected with {}", response.status()),
            )
            .with_detail("session_id", session_id.as_str()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            Self::request_error(ErrorCode::RuntimeRequestFailed, e.to_string())
        })?;
        Ok(Some(bytes.to_vec()))
    }
}
