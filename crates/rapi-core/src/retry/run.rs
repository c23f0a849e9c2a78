//! Retry loop: run one attempt until success or the policy says stop.

use super::policy::{RetryDecision, RetryPolicy};
use crate::clock::Clock;
use crate::error::ApiError;

/// Runs `attempt` until it succeeds or the policy stops it.
///
/// At most `max_retries + 1` attempts are made. On a retryable failure the
/// calling thread sleeps for the backoff delay; the last classified error is
/// returned once retries are exhausted or the failure is not retryable.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    operation: &str,
    mut attempt_fn: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Result<T, ApiError>,
{
    let total = policy.max_retries().saturating_add(1);
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(value) => return Ok(value),
            Err(e) => match policy.decide(attempt, &e) {
                RetryDecision::NoRetry => {
                    if attempt >= policy.max_retries() && policy.should_retry(e.kind, e.status_code) {
                        tracing::error!(
                            "{}: max retries ({}) exceeded, last error: {} ({})",
                            operation,
                            policy.max_retries(),
                            e,
                            e.kind
                        );
                    } else {
                        tracing::debug!("{}: error not retryable: {} ({})", operation, e, e.kind);
                    }
                    return Err(e);
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:.2}s",
                        operation,
                        attempt + 1,
                        total,
                        e,
                        delay.as_secs_f64()
                    );
                    clock.sleep(delay);
                    attempt += 1;
                }
            },
        }
    }
}
