//! Fixed-delay retry
//!
//! Spotkov never backs off: a failed call is repeated after a constant
//! delay until it succeeds or the attempt budget is spent.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Attempt budget and the pause between two attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Track search: 10 attempts, 250 ms apart
    pub const SEARCH: RetryPolicy = RetryPolicy::new(10, Duration::from_millis(250));

    /// Multi-chunk playlist writes: 100 attempts per chunk, 500 ms apart
    pub const CHUNK: RetryPolicy = RetryPolicy::new(100, Duration::from_millis(500));

    /// Current user lookup: 10 attempts back to back
    pub const CURRENT_USER: RetryPolicy = RetryPolicy::new(10, Duration::ZERO);

    /// A single attempt
    pub const ONCE: RetryPolicy = RetryPolicy::new(1, Duration::ZERO);

    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Same budget with another delay
    pub const fn with_delay(self, delay: Duration) -> Self {
        Self::new(self.max_attempts, delay)
    }

    /// Run `op` until it succeeds or the budget is spent
    ///
    /// Returns the last error when every attempt failed. A zero budget
    /// still makes one attempt.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    debug!(what, attempt, error = %e, "Attempt failed, retrying");
                    attempt += 1;
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = RetryPolicy::new(5, Duration::ZERO)
            .run("test", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("fail {}", n)) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = RetryPolicy::new(4, Duration::from_millis(1))
            .run("test", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("fail {}", n))
            })
            .await;

        assert_eq!(result, Err("fail 4".to_string()));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let _: Result<(), &str> = RetryPolicy::SEARCH.run("test", || async { Err("down") }).await;
        assert_eq!(start.elapsed(), Duration::from_millis(250 * 9));
    }

    #[test]
    fn test_presets() {
        assert_eq!(RetryPolicy::SEARCH.max_attempts, 10);
        assert_eq!(RetryPolicy::CHUNK.max_attempts, 100);
        assert_eq!(RetryPolicy::CHUNK.delay, Duration::from_millis(500));
    }
}
