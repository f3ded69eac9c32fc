//! Bounded polling with a fixed delay between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy {
    fn from(config: &crate::config::RetryConfig) -> Self {
        Self::new(
            config.frame_attempts,
            Duration::from_millis(config.frame_interval_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Runs `probe` until it yields `Some`, at most `policy.attempts` times.
///
/// `Ok(None)` and `Err(_)` both count as a miss; the delay is not applied
/// after the final attempt.
pub async fn poll<T, E, F, Fut>(policy: RetryPolicy, mut probe: F) -> Result<T, Exhausted>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let mut last_error = None;

    for attempt in 1..=policy.attempts {
        match probe(attempt).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::debug!(attempt, attempts = policy.attempts, "Probe missed");
            }
            Err(e) => {
                tracing::debug!(attempt, attempts = policy.attempts, error = %e, "Probe failed");
                last_error = Some(e.to_string());
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(Exhausted {
        attempts: policy.attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_poll_stops_after_configured_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = poll(instant(4), |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(None) }
        })
        .await;

        assert_eq!(
            result,
            Err(Exhausted {
                attempts: 4,
                last_error: None
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_poll_returns_first_hit() {
        let result = poll(instant(10), |attempt| async move {
            Ok::<_, String>((attempt == 3).then_some(attempt))
        })
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_poll_keeps_last_error() {
        let result: Result<(), _> = poll(instant(2), |attempt| async move {
            Err::<Option<()>, _>(format!("boom {}", attempt))
        })
        .await;

        assert_eq!(result.unwrap_err().last_error.as_deref(), Some("boom 2"));
    }

    #[tokio::test]
    async fn test_poll_recovers_after_error() {
        let result = poll(instant(3), |attempt| async move {
            if attempt == 1 {
                Err("context destroyed".to_string())
            } else {
                Ok(Some("frame"))
            }
        })
        .await;

        assert_eq!(result, Ok("frame"));
    }

    #[tokio::test]
    async fn test_poll_zero_attempts_never_probes() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = poll(instant(0), |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(None) }
        })
        .await;

        assert_eq!(result.unwrap_err().attempts, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
