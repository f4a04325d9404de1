use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Factor to multiply delay by after each attempt; 1.0 keeps the delay fixed
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(5),
            backoff_factor: 1.0,
        }
    }
}

impl RetryConfig {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: delay,
            max_delay: delay,
            backoff_factor: 1.0,
        }
    }
}

/// Retry policy for determining if an error is retryable
pub trait RetryPolicy<E> {
    fn is_retryable(&self, error: &E) -> bool;
}

/// Retries only connection-level database failures
#[derive(Debug, Clone, Copy, Default)]
pub struct DbRetryPolicy;

impl RetryPolicy<sea_orm::DbErr> for DbRetryPolicy {
    fn is_retryable(&self, error: &sea_orm::DbErr) -> bool {
        use sea_orm::DbErr;

        matches!(error, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
    }
}

impl RetryPolicy<ServiceError> for DbRetryPolicy {
    fn is_retryable(&self, error: &ServiceError) -> bool {
        error.is_transient()
    }
}

/// Execute an async function with retries
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    policy: impl RetryPolicy<E>,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(attempts, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                if attempts >= config.max_attempts || !policy.is_retryable(&error) {
                    if attempts > 1 {
                        warn!(attempts, error = %error, "giving up on operation");
                    }
                    return Err(error);
                }

                warn!(
                    attempt = attempts,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying"
                );

                sleep(delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_factor)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}
