//! Fixed-delay retry with upstream error classification.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use vpcshare_common::{Error, Result};

/// Attempt count and inter-attempt delay.
///
/// Each session owns its own copy; changing one session's policy never
/// affects another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a retry policy.
    ///
    /// # Errors
    /// - `max_attempts` is zero
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Config(
                "Retry attempt count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(60),
        }
    }
}

/// Whether `err` can never succeed on retry.
///
/// Classification goes through the reason code the caller sees. For
/// upstream errors that is the first envelope item's code, with a 404 of
/// unknown code counting as not-found. Transport failures and unlisted
/// codes stay retryable.
pub fn skip_retry(err: &Error) -> bool {
    err.reason_code().is_terminal()
}

/// Run `operation` under `policy`.
///
/// Attempts are strictly sequential with the full delay between them.
/// Returns the first success, the first terminal error, or the last error
/// once attempts run out.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("Operation succeeded on attempt {}", attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if skip_retry(&err) {
                    debug!(reason = %err.reason_code(), "Not retrying terminal error: {}", err);
                    return Err(err);
                }

                if attempt >= policy.max_attempts {
                    warn!("Operation failed after {} attempts: {}", attempt, err);
                    return Err(err);
                }

                warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempt, err, policy.delay
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
