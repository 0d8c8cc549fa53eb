//! Retry combinator with linear backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::clock::Sleeper;

use super::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self { attempts, base_delay }
    }

    /// Delay between attempt `attempt` and the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        ApiError::is_retryable(self)
    }
}

/// Run `attempt` until it succeeds, fails terminally, or the policy is spent.
///
/// Attempts are numbered from 1 and run strictly one after another. The last
/// error is returned once attempts are exhausted.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, sleeper: &dyn Sleeper, mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_attempts();
    let mut current = 1;

    loop {
        match attempt(current).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && current < max_attempts => {
                let delay = policy.delay_after(current);
                warn!(
                    attempt = current,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, retrying"
                );
                sleeper.sleep(delay).await;
                current += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    error!(attempts = current, error = %err, "All attempts failed");
                }
                return Err(err);
            }
        }
    }
}
