//! Transient-failure retries for ARM requests
//!
//! Failed attempts are retried with exponential backoff while the error
//! classifies as transient. When the server names its own wait through
//! `Retry-After` that wait replaces the backoff step for that attempt.

use crate::error::{AzmError, Result};
use crate::utils::network::is_retryable_error;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_retries: usize,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryOptions {
    fn next_interval(&self, interval: Duration) -> Duration {
        Duration::from_secs_f64(interval.as_secs_f64() * self.multiplier).min(self.max_interval)
    }
}

/// A failed attempt and the wait the server asked for, if any
#[derive(Debug)]
pub struct AttemptError {
    pub error: AzmError,
    pub retry_after: Option<Duration>,
}

impl AttemptError {
    pub fn with_retry_after(error: AzmError, retry_after: Option<Duration>) -> Self {
        Self { error, retry_after }
    }
}

impl From<AzmError> for AttemptError {
    fn from(error: AzmError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

pub async fn retry_with_backoff<T, F, Fut>(mut attempt: F, options: RetryOptions) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let attempts = options.max_retries + 1;
    let mut backoff = options.initial_interval;
    let mut number = 1;

    loop {
        let failure = match attempt().await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        if number >= attempts || !is_retryable_error(&failure.error) {
            return Err(failure.error);
        }

        let delay = failure.retry_after.unwrap_or(backoff);
        warn!(
            "Transient failure (attempt {}/{}), retrying in {:?}: {}",
            number, attempts, delay, failure.error
        );
        sleep(delay).await;
        backoff = options.next_interval(backoff);
        number += 1;
    }
}
