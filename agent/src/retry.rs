use std::future::Future;
use std::time::Duration;
use log::warn;

use common::HttpConfig;
use crate::error::Result;

/// Bounded exponential backoff for transient IAM failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// `max_retries` counts retries after the first attempt.
    pub fn from_config(http: &HttpConfig) -> Self {
        Self {
            max_attempts: http.max_retries.saturating_add(1),
            base_delay: Duration::from_millis(http.backoff_ms),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation, attempt, self.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IamError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn retries_are_counted_after_first_attempt() {
        let default = RetryPolicy::from_config(&HttpConfig::default());
        assert_eq!(default.max_attempts, 4);

        let no_retry = HttpConfig { max_retries: 0, ..HttpConfig::default() };
        assert_eq!(RetryPolicy::from_config(&no_retry).max_attempts, 1);
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast(3)
            .run("list groups", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(IamError::Backend { status: 502, message: "bad gateway".into() })
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = fast(5)
            .run("create grants", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(IamError::Backend { status: 403, message: "forbidden".into() })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = fast(2)
            .run("delete grant", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(IamError::Backend { status: 500, message: "boom".into() })
            })
            .await;

        assert!(matches!(result, Err(IamError::Backend { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
