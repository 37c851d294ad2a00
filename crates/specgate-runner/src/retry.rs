//! Bounded retry for fallible tool and network operations.

use specgate_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Upper bound for a single exponential back-off wait.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            exponential_backoff: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            exponential_backoff: false,
        }
    }

    /// Three attempts back to back.
    pub fn immediate() -> Self {
        Self::new(3, Duration::ZERO)
    }

    /// Delay before the attempt following `attempt` (1-based). Exponential
    /// back-off is capped at [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return self.delay;
        }
        self.delay
            .checked_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are exhausted.
///
/// `operation` receives the 1-based attempt number. The last error is
/// returned unchanged. Cancellation during the back-off wait yields
/// `Error::Cancelled`.
pub async fn retry_with<T, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    cancel: &CancellationToken,
    mut operation: F,
    is_retryable: P,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = %label, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                warn!(
                    operation = %label,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(Error::Cancelled { program: label.to_string() });
                    }
                    _ = sleep(policy.delay_for(attempt)) => {}
                }
                attempt += 1;
            }
            Err(e) => {
                error!(operation = %label, attempt, max_attempts, error = %e, "Giving up");
                return Err(e);
            }
        }
    }
}

/// [`retry_with`] using [`Error::is_retryable`] as the predicate.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with(policy, label, cancel, operation, Error::is_retryable).await
}
