use anyhow::Result;
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use crate::error::ForgeError;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries (will be multiplied by 2^attempt)
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Calculate delay for a given attempt (exponential backoff)
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay * 2u32.saturating_pow(attempt);
        std::cmp::min(delay, self.max_delay)
    }
}

/// Retry a fallible async operation with exponential backoff
///
/// Errors that [`is_retryable_error`] rejects are returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt, "operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) if attempt < config.max_retries && is_retryable_error(&e) => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "operation failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fragments of the transient failures the model providers report: dropped
/// connections, timeouts, rate limiting (HTTP 429), and Anthropic's
/// overloaded (529) or unavailable (503) responses.
const TRANSIENT: &[&str] = &[
    "connection",
    "timed out",
    "timeout",
    "rate limit",
    "429",
    "overloaded",
    "529",
    "503",
];

/// Whether a failed model call is worth repeating.
///
/// Typed run errors never are; everything else is matched against [`TRANSIENT`].
pub fn is_retryable_error(error: &anyhow::Error) -> bool {
    if error.downcast_ref::<ForgeError>().is_some() {
        return false;
    }
    let text = format!("{:#}", error).to_lowercase();
    TRANSIENT.iter().any(|fragment| text.contains(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new(3, 1000);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };

        // 2^10 seconds would be 1024 seconds, but should be capped at 10
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(10));
    }

    #[test]
    fn provider_transients_are_retryable() {
        assert!(is_retryable_error(&anyhow::anyhow!("connection refused")));
        assert!(is_retryable_error(&anyhow::anyhow!(
            "model call timed out after 300 seconds"
        )));
        assert!(is_retryable_error(&anyhow::anyhow!("rate limit exceeded")));
        assert!(is_retryable_error(&anyhow::anyhow!("HTTP 529: Overloaded")));
        assert!(is_retryable_error(&anyhow::anyhow!("503 Service Unavailable")));

        assert!(!is_retryable_error(&anyhow::anyhow!("invalid api key")));
        assert!(!is_retryable_error(&anyhow::anyhow!("model not found")));
        assert!(!is_retryable_error(&anyhow::anyhow!("400 prompt is too long")));
    }

    #[test]
    fn typed_errors_are_never_retried() {
        let err = anyhow::Error::new(ForgeError::BudgetExceeded {
            spent: 1.0,
            budget: 1.0,
        });
        assert!(!is_retryable_error(&err));
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let config = RetryConfig::new(3, 1);
        let mut calls = 0;
        let result = retry_with_backoff(&config, "test", || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    anyhow::bail!("connection reset")
                }
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn permanent_failures_stop_immediately() {
        let config = RetryConfig::new(3, 1);
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff(&config, "test", || {
            calls += 1;
            async { anyhow::bail!("invalid api key") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
