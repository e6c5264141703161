//! Bounded retry with exponential back-off for transient directory
//! failures.
//!
//! Only [`DirectoryError::Transient`] is retried.  `AlreadyExists` and
//! `NotFound` are answers, not failures, and `Rejected` will not improve
//! on a second try, so all three return immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use wp_domain::config::RetryConfig;
use wp_domain::error::{DirectoryError, DirectoryResult};

/// Controls how often and how patiently a transient failure is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied after doubling.
    pub max_delay: Duration,
    /// Retries after the initial attempt.  `0` disables retrying.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            max_retries: cfg.max_retries,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

/// Suspends the current task between retries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Returns immediately.  For tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _delay: Duration) {}
}

/// Run `f`, retrying transient failures per `policy`.
///
/// Returns the last error once retries are exhausted.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    mut f: F,
) -> DirectoryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DirectoryResult<T>>,
{
    let mut retry = 0u32;
    loop {
        match f().await {
            Err(DirectoryError::Transient(msg)) if retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay_for_retry(retry);
                tracing::debug!(
                    operation,
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    error = %msg,
                    "transient directory failure, backing off"
                );
                sleeper.sleep(delay).await;
            }
            Err(e @ DirectoryError::Transient(_)) => {
                tracing::warn!(operation, retries = retry, error = %e, "giving up after retries");
                return Err(e);
            }
            other => return other,
        }
    }
}
