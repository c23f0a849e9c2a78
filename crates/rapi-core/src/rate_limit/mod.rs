//! Token-bucket rate limiting for outgoing API calls.
//!
//! A bucket holds up to `requests_per_window` tokens and refills continuously
//! at `requests_per_window / window` tokens per second. Refill happens lazily on
//! every call, so there is no background timer thread.

mod limiter;

pub use limiter::RateLimiter;

use anyhow::Result;
use std::time::Duration;

/// Bucket parameters, fixed for the lifetime of a limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    /// Bucket capacity and number of calls allowed per window.
    pub requests_per_window: u32,
    /// Length of the window over which the full capacity refills.
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 1000,
            window: Duration::from_secs(3600),
        }
    }
}

impl RateLimiterConfig {
    pub fn per_hour(requests: u32) -> Self {
        Self {
            requests_per_window: requests,
            window: Duration::from_secs(3600),
        }
    }

    /// Reject configurations that would yield an empty or never-refilling bucket.
    pub fn validate(&self) -> Result<()> {
        if self.requests_per_window == 0 {
            anyhow::bail!("rate limit requests_per_window must be at least 1");
        }
        if self.window.is_zero() {
            anyhow::bail!("rate limit window must be longer than zero");
        }
        Ok(())
    }

    /// Tokens added per second of elapsed time.
    pub fn refill_rate_per_sec(&self) -> f64 {
        f64::from(self.requests_per_window) / self.window.as_secs_f64()
    }
}
