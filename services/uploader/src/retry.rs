//! Bounded exponential backoff for the two protocol calls.
//!
//! Both calls are idempotent on the server (a repeated check is counted as
//! already observed, a repeated upsert rewrites the same line), so a call
//! that failed in transit can be sent again.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::UploadError;

/// Upper bound on a single backoff sleep.
pub const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 disables retrying.
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_DELAY)
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        call = label,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(1), Duration::from_millis(1000));
        assert_eq!(policy.delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy { retries: 30, ..RetryPolicy::default() };
        assert_eq!(policy.delay(6), MAX_DELAY);
        assert_eq!(policy.delay(29), MAX_DELAY);
        assert_eq!(policy.delay(u32::MAX), MAX_DELAY);
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let calls = Cell::new(0);
        let result = fast(2)
            .run("check", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(UploadError::Api { status: 503, message: "HTTP 503".into() })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast(1)
            .run("lines", || {
                calls.set(calls.get() + 1);
                async { Err(UploadError::Api { status: 500, message: "HTTP 500".into() }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast(5)
            .run("lines", || {
                calls.set(calls.get() + 1);
                async { Err(UploadError::Api { status: 200, message: "rejected".into() }) }
            })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "rejected");
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let calls = Cell::new(0);
        let _ = RetryPolicy::none()
            .run("check", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(UploadError::Api { status: 502, message: "HTTP 502".into() }) }
            })
            .await;
        assert_eq!(calls.get(), 1);
    }
}
