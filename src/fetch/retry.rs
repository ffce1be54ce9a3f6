use std::time::Duration;

use tracing::warn;

use crate::error::Result;
use crate::utils::time::Clock;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How many times a transient transport failure is retried, and how long to
/// wait before each attempt. The wait doubles per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    initial: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, initial: Duration) -> Self {
        Self {
            retries,
            initial: initial.max(Duration::from_millis(1)),
        }
    }

    /// Fail on the first error.
    pub fn none() -> Self {
        Self::new(0, Duration::from_millis(1))
    }

    pub fn run<C, T, F>(&self, clock: &C, operation: &str, mut f: F) -> Result<T>
    where
        C: Clock,
        F: FnMut() -> Result<T>,
    {
        let mut delay = self.initial;
        let mut attempt = 0;
        loop {
            match f() {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    clock.sleep(delay);
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::utils::time::fake::FakeClock;

    #[test]
    fn test_retries_transient_with_backoff() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let mut calls = 0;

        let result = policy.run(&clock, "GetMetricStatistics", || {
            calls += 1;
            if calls < 3 {
                Err(Error::transport("GetMetricStatistics", "Rate exceeded").into_transient())
            } else {
                Ok(calls)
            }
        });

        assert_eq!(3, result.unwrap());
        assert_eq!(
            vec![Duration::from_millis(100), Duration::from_millis(200)],
            clock.sleeps()
        );
    }

    #[test]
    fn test_gives_up_after_budget() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::new(2, Duration::from_millis(100));
        let mut calls = 0;

        let result: Result<()> = policy.run(&clock, "ListMetrics", || {
            calls += 1;
            Err(Error::transport("ListMetrics", "503").into_transient())
        });

        assert!(result.is_err());
        assert_eq!(3, calls);
    }

    #[test]
    fn test_permanent_errors_fail_fast() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let mut calls = 0;

        let result: Result<()> = policy.run(&clock, "ListMetrics", || {
            calls += 1;
            Err(Error::transport("ListMetrics", "AccessDenied"))
        });

        assert!(result.is_err());
        assert_eq!(1, calls);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_none_never_retries() {
        let clock = FakeClock::new();
        let mut calls = 0;

        let result: Result<()> = RetryPolicy::none().run(&clock, "ListMetrics", || {
            calls += 1;
            Err(Error::transport("ListMetrics", "503").into_transient())
        });

        assert!(result.is_err());
        assert_eq!(1, calls);
    }
}
