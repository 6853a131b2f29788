//! Retry wrapper for event handlers.
//!
//! Pure exponential backoff, no jitter: attempt the action, and on failure
//! sleep `base_delay * 2^(attempt-1)` before the next try. After the final
//! attempt the error is logged and swallowed - one event handler's permanent
//! failure must never block sibling handlers or the rest of the dispatch
//! loop. Never applied to command or query handlers.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

use crate::domain::foundation::CoreError;

/// How often and how patiently event handlers are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Sleep before the second attempt; doubles each attempt after.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Returns the sleep before the attempt after `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Runs `action` under the retry policy, swallowing the final error.
///
/// `description` identifies the action in logs (typically the handler name
/// plus the event name it is processing).
pub async fn run_with_retries<F, Fut>(policy: &RetryPolicy, description: &str, mut action: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), CoreError>>,
{
    for attempt in 1..=policy.max_attempts {
        match action().await {
            Ok(()) => return,
            Err(err) if attempt == policy.max_attempts => {
                error!(
                    %err,
                    description,
                    attempts = policy.max_attempts,
                    "event handler failed permanently; giving up"
                );
                return;
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    %err,
                    description,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "event handler failed; retrying"
                );
                sleep(delay).await;
            }
        }
    }
}
