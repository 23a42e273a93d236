//! Retry policy for cross-context messaging
//!
//! One parameterized policy covers every command that needs retrying, so
//! the attempt bound and backoff live in a single place.

use std::future::Future;
use std::time::Duration;

/// Bounded retry with fixed backoff and per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
    /// Per-attempt timeout; a silent peer counts as a failed attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(200),
            timeout: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts are exhausted, surfacing the
    /// last error
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts => {
                    tracing::warn!(attempt, "giving up after final attempt: {}", err);
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max = self.max_attempts,
                        "attempt failed, retrying: {}",
                        err
                    );
                }
            }
            attempt += 1;
            tokio::time::sleep(self.backoff).await;
        }
    }
}
