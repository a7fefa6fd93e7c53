//! Bounded exponential-backoff retry for transient Moodle transport errors.
//!
//! Discovery must not fail a whole resolution because one HTTP call hit a
//! timeout or a reset connection. The combinator here wraps any Moodle call;
//! the policy stays testable independently of the discovery logic. API
//! errors (invalid token, access denied) are never retried — they reproduce
//! deterministically.

use std::future::Future;
use std::time::Duration;

use crate::error::MoodleError;

/// Configuration for retry behavior on transient transport errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// Returns the first success, the first non-transient error, or the last
/// transient error once `max_attempts` is exhausted.
///
/// # Errors
///
/// Propagates the operation's [`MoodleError`].
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, MoodleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MoodleError>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "transient Moodle error, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Produce a real transport error without a network: connection refused.
    async fn transport_error() -> MoodleError {
        reqwest::Client::new()
            .get("http://127.0.0.1:9/unreachable")
            .send()
            .await
            .expect_err("port 9 must refuse")
            .into()
    }

    fn api_error() -> MoodleError {
        MoodleError::Api {
            code: "invalidtoken".to_string(),
            message: "Invalid token - token not found".to_string(),
        }
    }

    /// Millisecond delays so retry tests run in real time without waiting.
    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn returns_first_success_without_retry() {
        let attempts = Arc::new(AtomicU32::new(0));
        let result = retry_transient(&fast_policy(), || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, MoodleError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transport_errors_then_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let result = retry_transient(&fast_policy(), || {
            let attempts = Arc::clone(&attempts);
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(transport_error().await)
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let result: Result<u32, _> = retry_transient(&fast_policy(), || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(transport_error().await)
            }
        })
        .await;
        assert!(matches!(result.unwrap_err(), MoodleError::Http(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn api_errors_are_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let result: Result<u32, _> = retry_transient(&fast_policy(), || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(api_error())
            }
        })
        .await;
        assert!(matches!(result.unwrap_err(), MoodleError::Api { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
