use std::time::{Duration, Instant};

use tracing::debug;

use crate::utils::time::Clock;

pub const DEFAULT_MAX_REQUESTS: u32 = 2;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Self-imposed request budget: at most `max_requests` calls per window,
/// after which the caller is put to sleep for one window.
///
/// The budget is per process. Several pollers running side by side each get
/// their own, so the remote service sees the sum of them.
#[derive(Debug)]
pub struct RateLimiter<C> {
    clock: C,
    max_requests: u32,
    window: Duration,
    request_count: u32,
    window_reset_at: Instant,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C, max_requests: u32, window: Duration) -> Self {
        let window_reset_at = clock.now() + window;
        Self {
            clock,
            max_requests,
            window,
            request_count: 0,
            window_reset_at,
        }
    }

    /// Accounts for one outbound request, blocking the thread if the current
    /// window's budget is exhausted. Returns the delay imposed, if any.
    pub fn throttle(&mut self) -> Option<Duration> {
        let now = self.clock.now();
        if now >= self.window_reset_at {
            self.request_count = 0;
            self.window_reset_at = now + self.window;
        }

        self.request_count += 1;
        if self.request_count <= self.max_requests {
            return None;
        }

        debug!(
            requests = self.request_count,
            sleep_ms = self.window.as_millis() as u64,
            "request budget exhausted, sleeping"
        );
        self.clock.sleep(self.window);
        self.request_count = 0;
        self.window_reset_at = self.clock.now() + self.window;
        Some(self.window)
    }

    #[inline]
    pub fn request_count(&self) -> u32 {
        self.request_count
    }
}
