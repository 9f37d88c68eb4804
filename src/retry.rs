use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::config::RpcConfig;
use crate::error::IndexerError;
use crate::logging::{ErrorLogger, LogContext};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between attempts
    pub initial_delay: Duration,
    /// Upper bound for the delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RpcConfig::default())
    }
}

impl From<&RpcConfig> for RetryConfig {
    fn from(config: &RpcConfig) -> Self {
        Self {
            max_attempts: config.max_retries.saturating_add(1),
            initial_delay: Duration::from_secs(config.retry_delay_seconds),
            max_delay: Duration::from_secs(config.max_retry_delay_seconds),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Retries recoverable failures with exponential backoff and jitter
#[derive(Debug, Clone)]
pub struct RetryManager {
    config: RetryConfig,
}

impl RetryManager {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation, retrying while the error is recoverable
    pub async fn execute<T, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T, IndexerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, IndexerError>>,
    {
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        ErrorLogger::log_recovery_success(
                            operation_name,
                            attempt,
                            started.elapsed().as_millis() as u64,
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_recoverable() {
                        let context = LogContext::new("retry", operation_name)
                            .with_retry_count(attempt)
                            .with_metadata("reason", serde_json::json!("non_recoverable"));
                        context.debug(&format!("Non-recoverable error, not retrying: {}", error));
                        return Err(error);
                    }

                    ErrorLogger::log_recovery_attempt(operation_name, &error, attempt, self.config.max_attempts);

                    if attempt >= self.config.max_attempts {
                        return Err(error);
                    }

                    let delay = match error.retry_after() {
                        Some(requested) => requested.min(self.config.max_delay),
                        None => self.calculate_delay(attempt),
                    };
                    LogContext::new("retry", operation_name)
                        .with_retry_count(attempt)
                        .with_metadata("delay_ms", serde_json::json!(delay.as_millis() as u64))
                        .debug(&format!("Retrying in {}ms", delay.as_millis()));

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Calculate delay after the given (1-based) failed attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay.as_secs_f64();
        let exponential_delay = base_delay * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let capped_delay = exponential_delay.min(self.config.max_delay.as_secs_f64());

        let final_delay = if self.config.jitter {
            let jitter_factor = 0.1;
            let jitter = capped_delay * jitter_factor * (rand::random::<f64>() - 0.5);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, RpcError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_retry_config_from_rpc_config() {
        let rpc = RpcConfig {
            max_retries: 4,
            retry_delay_seconds: 3,
            max_retry_delay_seconds: 12,
            ..RpcConfig::default()
        };
        let config = RetryConfig::from(&rpc);
        // first attempt plus four retries
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay, Duration::from_secs(3));
        assert_eq!(config.max_delay, Duration::from_secs(12));
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let rpc = RpcConfig {
            max_retries: 0,
            ..RpcConfig::default()
        };
        assert_eq!(RetryConfig::from(&rpc).max_attempts, 1);
        assert_eq!(RetryConfig::default().max_attempts, 4);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let manager = RetryManager::new(fast_config(3));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = manager
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<i32, IndexerError>(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recoverable_error_is_retried_until_success() {
        let manager = RetryManager::new(fast_config(3));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = manager
            .execute("test", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(IndexerError::Rpc(RpcError::Timeout { seconds: 1 }))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let manager = RetryManager::new(fast_config(2));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = manager
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(IndexerError::Rpc(RpcError::Connection("refused".to_string())))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_recoverable_error_fails_immediately() {
        let manager = RetryManager::new(fast_config(5));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = manager
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(IndexerError::Decode(DecodeError::BlockNumber("x".to_string())))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_wait_is_capped_by_max_delay() {
        let manager = RetryManager::new(fast_config(2));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = Instant::now();

        let result = manager
            .execute("test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(IndexerError::Rpc(RpcError::RateLimit { retry_after: Some(60) }))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_delay_calculation() {
        let manager = RetryManager::new(RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        });

        assert_eq!(manager.calculate_delay(1).as_secs(), 2);
        assert_eq!(manager.calculate_delay(2).as_secs(), 4);
        assert_eq!(manager.calculate_delay(3).as_secs(), 8);
        // 2 * 2^5 = 64, capped at 30
        assert_eq!(manager.calculate_delay(6).as_secs(), 30);
    }
}
