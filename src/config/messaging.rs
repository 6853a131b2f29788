//! Message bus configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::retry::RetryPolicy;

use super::error::ValidationError;

/// Message bus configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Total attempts per event handler, including the first
    #[serde(default = "default_max_attempts")]
    pub max_event_attempts: u32,

    /// Base backoff delay in milliseconds; doubles per attempt
    #[serde(default = "default_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl MessagingConfig {
    /// Build the retry policy the bus runs event handlers under
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_event_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    /// Validate messaging configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_event_attempts == 0 {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        Ok(())
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_event_attempts: default_max_attempts(),
            retry_base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}
