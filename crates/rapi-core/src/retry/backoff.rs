//! Exponential backoff without jitter.

use std::time::Duration;

/// `min(initial * base^attempt, max)`. `attempt` is 0-based: 0 is the delay
/// before the first retry.
pub fn delay(attempt: u32, initial: Duration, max: Duration, base: f64) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = initial.as_secs_f64() * base.powi(exponent);
    if !secs.is_finite() || secs >= max.as_secs_f64() {
        return max;
    }
    Duration::from_secs_f64(secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(60);

    #[test]
    fn doubles_from_initial_delay() {
        assert_eq!(delay(0, INITIAL, MAX, 2.0), Duration::from_secs(1));
        assert_eq!(delay(1, INITIAL, MAX, 2.0), Duration::from_secs(2));
        assert_eq!(delay(2, INITIAL, MAX, 2.0), Duration::from_secs(4));
        assert_eq!(delay(5, INITIAL, MAX, 2.0), Duration::from_secs(32));
    }

    #[test]
    fn clamps_at_max_delay() {
        assert_eq!(delay(6, INITIAL, MAX, 2.0), MAX);
        assert_eq!(delay(40, INITIAL, MAX, 2.0), MAX);
        assert_eq!(delay(u32::MAX, INITIAL, MAX, 2.0), MAX);
    }

    #[test]
    fn monotonic_until_clamp_and_never_above_max() {
        let initial = Duration::from_millis(250);
        let max = Duration::from_secs(30);
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let d = delay(attempt, initial, max, 1.5);
            assert!(d >= previous, "attempt {attempt}: {d:?} < {previous:?}");
            assert!(d <= max);
            previous = d;
        }
        assert_eq!(previous, max);
    }
}
