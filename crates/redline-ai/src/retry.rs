//! Bounded retry around a single model call.
//!
//! Each attempt is classified as success, retryable or fatal. Rate limits
//! back off exponentially (`base_delay * 2^attempt`); every other retryable
//! failure waits `base_delay`. There is no wait after the final attempt,
//! and rejected credentials stop the loop at once.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::client::{GenerateRequest, ModelClient, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt after attempt `attempt` (0-based)
    /// failed with `error`.
    pub fn backoff(&self, attempt: u32, error: &ModelError) -> Duration {
        match error {
            ModelError::RateLimited(_) => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
            _ => self.base_delay,
        }
    }
}

/// Classified result of one attempt. A blank answer counts as a
/// retryable failure whichever client produced it.
#[derive(Debug, PartialEq)]
pub enum AttemptOutcome {
    Success(String),
    Retryable(ModelError),
    Fatal(ModelError),
}

impl AttemptOutcome {
    pub fn classify(result: Result<String, ModelError>) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => Self::Retryable(ModelError::EmptyResponse),
            Ok(text) => Self::Success(text),
            Err(e @ ModelError::Unauthorized { .. }) => Self::Fatal(e),
            Err(e) => Self::Retryable(e),
        }
    }
}

/// Every attempt failed, or a fatal failure ended the loop early.
#[derive(Debug, Error)]
#[error("model unavailable after {attempts} attempt(s): {last_error}")]
pub struct ModelUnavailable {
    pub attempts: u32,
    pub last_error: ModelError,
}

/// Run `request` against `client` under `policy`.
pub async fn generate_with_retry<C: ModelClient + ?Sized>(
    client: &C,
    request: &GenerateRequest,
    policy: &RetryPolicy,
) -> Result<String, ModelUnavailable> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        info!(attempt, max_attempts, "model call");

        match AttemptOutcome::classify(client.generate(request).await) {
            AttemptOutcome::Success(text) => {
                info!(attempt, "model call succeeded");
                return Ok(text);
            }
            AttemptOutcome::Fatal(e) => {
                error!(attempt, error = %e, "model call failed fatally; not retrying");
                return Err(ModelUnavailable {
                    attempts: attempt,
                    last_error: e,
                });
            }
            AttemptOutcome::Retryable(e) => {
                warn!(attempt, error = %e, "model call failed");
                if attempt >= max_attempts {
                    error!(attempts = attempt, error = %e, "all model call attempts failed");
                    return Err(ModelUnavailable {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                let wait = policy.backoff(attempt - 1, &e);
                info!(wait_ms = wait.as_millis() as u64, "backing off before retry");
                tokio::time::sleep(wait).await;
            }
        }
    }
}
