//! Agent runtime configuration

use serde::Deserialize;
use std::time::Duration;

use crate::ports::RuntimeCredentials;

use super::error::ValidationError;

/// Agent runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL of the runtime's HTTP surface
    pub base_url: String,

    /// OAuth token pushed to the runtime before starting it
    pub oauth_token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl RuntimeConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the credentials wrapper; the token lives behind `secrecy`
    /// from here on.
    pub fn credentials(&self) -> RuntimeCredentials {
        RuntimeCredentials::new(self.oauth_token.clone())
    }

    /// Validate runtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("RUNTIME_BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidRuntimeUrl);
        }
        if self.oauth_token.is_empty() {
            return Err(ValidationError::MissingRequired("RUNTIME_OAUTH_TOKEN"));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            oauth_token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    120
}
