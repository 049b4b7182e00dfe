//! Bounded retry of optimistic writes

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::AdmissionConfig;
use crate::database::Versioned;
use crate::utils::errors::{EventHubError, Result};

/// Retries an operation whose commit came back stale.
///
/// Each attempt must re-read whatever it decides on; a stale result after the
/// last attempt becomes a conflict.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.max_attempts, config.retry_backoff())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Versioned<T>>>,
    {
        for n in 1..=self.max_attempts {
            match attempt().await? {
                Versioned::Committed(value) => return Ok(value),
                Versioned::Stale => {
                    debug!(operation = operation, attempt = n, "Stale write, retrying");
                    if n < self.max_attempts {
                        tokio::time::sleep(self.jittered_backoff(n)).await;
                    }
                }
            }
        }

        Err(EventHubError::conflict("capacity changed, retry"))
    }

    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let base = self.backoff.as_millis() as u64 * u64::from(attempt);
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        Duration::from_millis(base + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(10))
    }
}
