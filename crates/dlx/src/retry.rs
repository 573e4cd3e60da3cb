// Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed pause between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Five attempts, one second apart.
    pub const fn part_default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::part_default()
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// The closure receives the 1-based attempt number. The last error is
/// returned together with the number of attempts made.
pub async fn retry_fixed<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, (E, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if policy.allows_retry_after(attempt) => {
                warn!(
                    attempt,
                    max = policy.attempts(),
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "Retrying after failure"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err((err, attempt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        assert_eq!(quick(0).attempts(), 1);
        assert!(!quick(0).allows_retry_after(1));
    }

    #[test]
    fn part_default_is_five_one_second_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 5);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let result: Result<u32, (String, u32)> =
            retry_fixed(&quick(3), |_| async { Ok(42u32) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exhausts_then_reports_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), (String, u32)> = retry_fixed(&quick(3), |_| {
            calls.fetch_add(1, Ordering::Relaxed);
            async { Err("boom".to_string()) }
        })
        .await;
        let (err, attempts) = result.unwrap_err();
        assert_eq!(err, "boom");
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn succeeds_on_second_attempt() {
        let result: Result<u32, (String, u32)> = retry_fixed(&quick(5), |attempt| async move {
            if attempt == 1 {
                Err("timeout".to_string())
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }
}
