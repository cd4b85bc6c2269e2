//! Bounded exponential backoff for external provider calls.
//!
//! Mirrors the `tenacity` policy in `original_source`'s classifier and
//! sentiment services: `stop_after_attempt(3)`,
//! `wait_exponential(multiplier=1, min=2, max=10)`. spec.md pins it down
//! further as base 1s, cap 10s, jittered -- that's what's implemented here.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = exp.min(self.max_delay.as_secs_f64());
        let jitter = rand::rng().random_range(0.0..=capped * 0.25);
        Duration::from_secs_f64(capped + jitter)
    }
}

/// Runs `op` up to `policy.max_attempts` times, only retrying errors for
/// which `AppError::is_recoverable` is true. The last error is returned
/// verbatim to the caller, which decides whether to fall back.
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err: Option<AppError> = None;
    for attempt in 0..policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_recoverable() && attempt + 1 < policy.max_attempts => {
                tokio::time::sleep(policy.delay_for(attempt)).await;
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| AppError::dependency("llm", anyhow::anyhow!("retry exhausted"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_recoverable_errors_until_success() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };

        let result = retry_with_backoff(policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppError::dependency("test", anyhow::anyhow!("transient")))
                } else {
                    Ok::<_, AppError>(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_recoverable_errors() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<()> = retry_with_backoff(policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::validation("bad input")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
