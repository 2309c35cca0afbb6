//! Bounded retry with linear backoff for transactional units that hit lock contention.
//!
//! Only `AppError::Busy` is retried. Domain errors (not found, validation) and
//! any other database failure propagate on the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before retry `n` is `base_delay * n`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Runs `unit` until it succeeds, fails with a non-contention error, or
/// `policy.max_attempts` is reached. Each call of `unit` must open and commit
/// its own transaction so a retry starts again from a fresh read.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &str,
    mut unit: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match unit().await {
            Ok(value) => return Ok(value),
            Err(AppError::Busy(message)) => {
                if attempt >= policy.max_attempts {
                    error!(
                        operation,
                        attempt, "Database still locked, giving up: {message}"
                    );
                    return Err(AppError::StoreContention {
                        attempts: attempt,
                        message,
                    });
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    "Database locked, will retry after backoff: {message}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(other) => return Err(other),
        }
    }
}
