//! Thread-safe token bucket.

use super::RateLimiterConfig;
use crate::clock::{Clock, SystemClock};
use anyhow::Result;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Slack for float rounding, applied only on the re-check after a blocking wait.
const WAKE_EPSILON: f64 = 1e-6;

/// Token bucket shared by every call made through one logical API client.
///
/// `tokens` and the refill timestamp are only touched inside one mutex
/// critical section, so tokens are never over-allocated. The lock is released
/// while a blocking `acquire` sleeps; waiters are therefore not served in FIFO
/// order and a later caller may take tokens first.
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    clock: Arc<dyn Clock>,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, capacity: f64, rate: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }

    fn try_take(&mut self, requested: f64, slack: f64) -> bool {
        if self.tokens + slack >= requested {
            self.tokens = (self.tokens - requested).max(0.0);
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    /// Full bucket driven by the system clock.
    pub fn new(config: RateLimiterConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let capacity = f64::from(config.requests_per_window);
        let refill_per_sec = config.refill_rate_per_sec();
        tracing::info!(
            "initialized rate limiter: {} requests per {:?} ({:.4} requests/second)",
            config.requests_per_window,
            config.window,
            refill_per_sec
        );
        Ok(Self {
            capacity,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: clock.now(),
            }),
            clock,
        })
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate_per_sec(&self) -> f64 {
        self.refill_per_sec
    }

    /// Take `tokens` from the bucket.
    ///
    /// Returns `true` once the tokens are deducted. With `block = false` a short
    /// bucket returns `false` at once and leaves it untouched. With `block = true`
    /// the caller sleeps for the computed deficit, refills, and tries exactly
    /// once more; losing that race to another caller returns `false`.
    pub fn acquire(&self, tokens: u32, block: bool) -> bool {
        let requested = f64::from(tokens);
        if requested > self.capacity {
            tracing::warn!(
                "cannot acquire {} token(s): exceeds bucket capacity {}",
                tokens,
                self.capacity
            );
            return false;
        }

        let wait = {
            let mut bucket = self.lock_refilled();
            if bucket.try_take(requested, 0.0) {
                tracing::debug!("acquired {} token(s), remaining {:.2}", tokens, bucket.tokens);
                return true;
            }
            if !block {
                tracing::debug!(
                    "failed to acquire {} token(s), available {:.2}",
                    tokens,
                    bucket.tokens
                );
                return false;
            }
            wait_for(requested - bucket.tokens, self.refill_per_sec)
        };

        tracing::info!(
            "rate limit reached; waiting {:.2}s for {} token(s)",
            wait.as_secs_f64(),
            tokens
        );
        self.clock.sleep(wait);

        let mut bucket = self.lock_refilled();
        if bucket.try_take(requested, WAKE_EPSILON) {
            tracing::debug!(
                "acquired {} token(s) after waiting, remaining {:.2}",
                tokens,
                bucket.tokens
            );
            true
        } else {
            tracing::warn!(
                "failed to acquire {} token(s) after waiting, available {:.2}",
                tokens,
                bucket.tokens
            );
            false
        }
    }

    /// Current token count after a refill.
    pub fn get_available_tokens(&self) -> f64 {
        self.lock_refilled().tokens
    }

    /// Refill to capacity and restart the refill clock.
    pub fn reset(&self) {
        let mut bucket = self.lock();
        bucket.tokens = self.capacity;
        bucket.last_refill = self.clock.now();
        tracing::info!("rate limiter reset to full capacity");
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_refilled(&self) -> MutexGuard<'_, Bucket> {
        let mut bucket = self.lock();
        bucket.refill(self.clock.now(), self.capacity, self.refill_per_sec);
        bucket
    }
}

/// Time to accumulate `deficit` tokens; saturates at `Duration::MAX`.
fn wait_for(deficit: f64, refill_per_sec: f64) -> Duration {
    Duration::try_from_secs_f64(deficit / refill_per_sec).unwrap_or(Duration::MAX)
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity)
            .field("refill_per_sec", &self.refill_per_sec)
            .field("bucket", &*self.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn manual(requests: u32, window_secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cfg = RateLimiterConfig {
            requests_per_window: requests,
            window: Duration::from_secs(window_secs),
        };
        let limiter = RateLimiter::with_clock(cfg, clock.clone()).unwrap();
        (limiter, clock)
    }

    #[test]
    fn sequential_non_blocking_stops_at_capacity() {
        let (limiter, clock) = manual(1000, 3600);
        let granted = (0..1500).filter(|_| limiter.acquire(1, false)).count();
        assert_eq!(granted, 1000);
        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.get_available_tokens(), 0.0);
    }

    #[test]
    fn first_thousand_succeed_then_all_fail() {
        let (limiter, _clock) = manual(1000, 3600);
        let results: Vec<bool> = (0..1500).map(|_| limiter.acquire(1, false)).collect();
        assert!(results[..1000].iter().all(|ok| *ok));
        assert!(results[1000..].iter().all(|ok| !*ok));
    }

    #[test]
    fn non_blocking_failure_leaves_bucket_unchanged() {
        let (limiter, clock) = manual(10, 10);
        assert!(limiter.acquire(8, false));
        let before = limiter.get_available_tokens();
        assert!(!limiter.acquire(5, false));
        assert_eq!(limiter.get_available_tokens(), before);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn refill_is_linear_and_capped() {
        let (limiter, clock) = manual(3600, 3600);
        assert!(limiter.acquire(3600, false));
        assert_eq!(limiter.get_available_tokens(), 0.0);

        clock.advance(Duration::from_secs(10));
        assert!((limiter.get_available_tokens() - 10.0).abs() < 1e-9);

        clock.advance(Duration::from_secs(250));
        assert!((limiter.get_available_tokens() - 260.0).abs() < 1e-9);

        clock.advance(Duration::from_secs(1_000_000));
        assert_eq!(limiter.get_available_tokens(), 3600.0);
    }

    #[test]
    fn blocking_acquire_sleeps_for_deficit() {
        let (limiter, clock) = manual(2, 2);
        assert!(limiter.acquire(2, true));
        assert!(limiter.acquire(1, true));
        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 1);
        assert!((sleeps[0].as_secs_f64() - 1.0).abs() < 1e-6);
        assert!(limiter.get_available_tokens() < 1e-6);
    }

    #[test]
    fn blocking_acquire_waits_only_for_missing_fraction() {
        let (limiter, clock) = manual(4, 4);
        assert!(limiter.acquire(4, false));
        clock.advance(Duration::from_millis(250));
        assert!(limiter.acquire(1, true));
        let waited = clock.sleeps()[0].as_secs_f64();
        assert!((waited - 0.75).abs() < 1e-6);
    }

    #[test]
    fn request_above_capacity_fails_without_sleeping() {
        let (limiter, clock) = manual(5, 60);
        assert!(!limiter.acquire(6, true));
        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.get_available_tokens(), 5.0);
    }

    #[test]
    fn non_blocking_refuses_a_token_short_by_a_hair() {
        let (limiter, clock) = manual(10, 10);
        assert!(limiter.acquire(10, false));
        clock.advance(Duration::from_nanos(999_999_500));
        let before = limiter.get_available_tokens();
        assert!(before < 1.0, "{before}");
        assert!(!limiter.acquire(1, false));
        assert_eq!(limiter.get_available_tokens(), before);
    }

    #[test]
    fn wait_saturates_instead_of_overflowing() {
        assert_eq!(wait_for(1.0, 1.0 / 1e20), Duration::MAX);
        assert_eq!(wait_for(1.0, 0.0), Duration::MAX);
        assert_eq!(wait_for(3.0, 2.0), Duration::from_millis(1500));
    }

    #[test]
    fn reset_restores_capacity() {
        let (limiter, _clock) = manual(50, 3600);
        assert!(limiter.acquire(50, false));
        assert!(!limiter.acquire(1, false));
        limiter.reset();
        assert_eq!(limiter.get_available_tokens(), 50.0);
        assert!(limiter.acquire(1, false));
    }

    #[test]
    fn tokens_stay_within_bounds_for_mixed_sequence() {
        let (limiter, clock) = manual(20, 20);
        for i in 0u32..200 {
            let n = i % 7;
            let block = i % 3 == 0;
            limiter.acquire(n, block);
            if i % 5 == 0 {
                clock.advance(Duration::from_millis(u64::from(i) * 37));
            }
            let available = limiter.get_available_tokens();
            assert!(available >= 0.0, "tokens below zero: {available}");
            assert!(available <= 20.0, "tokens above capacity: {available}");
        }
    }

    #[test]
    fn concurrent_acquires_never_over_allocate() {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::per_hour(100)).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..50).filter(|_| limiter.acquire(1, false)).count())
            })
            .collect();
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 100);
    }
}
