//! Retry logic with configurable backoff for generation-request calls.
//!
//! Node-level resilience relies on the extraction ladder, not retries; this
//! helper is available for callers who want to wrap a flaky transport on
//! top of it.

use std::time::Duration;

use switchboard_types::{Result, TriageError};

/// Backoff policy controlling the delay between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffPolicy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
    /// No delay between retries.
    None,
}

impl BackoffPolicy {
    /// Compute the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, max } => {
                let millis = base.as_millis() as u64 * 2u64.saturating_pow(attempt as u32);
                Duration::from_millis(millis).min(*max)
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: Duration::from_millis(300),
            max: Duration::from_secs(10),
        }
    }
}

/// Call `f` up to `max_retries + 1` times, retrying only errors that satisfy
/// [`TriageError::is_retryable`], sleeping per `policy` between attempts.
pub async fn retry_with_backoff<T, F, Fut>(
    f: F,
    max_retries: usize,
    policy: &BackoffPolicy,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..=max_retries {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(attempt, delay_ms = %delay.as_millis(), error = %e, "Retryable error, retrying");
                tokio::time::sleep(delay).await;
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(TriageError::RetriesExhausted {
        attempts: max_retries + 1,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> TriageError {
        TriageError::ProviderError {
            provider: "test".into(),
            status: 429,
            message: "rate limited".into(),
            retryable: true,
        }
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let result = retry_with_backoff(|| async { Ok(42u32) }, 3, &BackoffPolicy::None).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retry_on_retryable_error_succeeds() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let result = retry_with_backoff(
            move || {
                let cc = cc.clone();
                async move {
                    let n = cc.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(rate_limited())
                    } else {
                        Ok("recovered")
                    }
                }
            },
            3,
            &BackoffPolicy::None,
        )
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn max_retries_exhausted_returns_last_error() {
        let result: Result<()> =
            retry_with_backoff(|| async { Err(rate_limited()) }, 2, &BackoffPolicy::None).await;

        // The final attempt's error is returned directly.
        assert!(matches!(
            result.unwrap_err(),
            TriageError::ProviderError { status: 429, .. }
        ));
    }

    #[tokio::test]
    async fn non_retryable_error_no_retry() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let result: Result<()> = retry_with_backoff(
            move || {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err(TriageError::ContractViolation {
                        contract: "urgency".into(),
                        message: "bad".into(),
                    })
                }
            },
            5,
            &BackoffPolicy::None,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fixed_backoff_constant_delay() {
        let policy = BackoffPolicy::Fixed(Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(7), Duration::from_millis(200));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let policy = BackoffPolicy::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn none_backoff_zero_delay() {
        let policy = BackoffPolicy::None;
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(99), Duration::ZERO);
    }

    #[test]
    fn default_backoff_is_exponential() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(600));
        assert_eq!(policy.delay_for_attempt(20), Duration::from_secs(10));
    }
}
