//! Retry and backoff policy.
//!
//! Failures are classified into [`crate::error::ErrorKind`] before they reach
//! this module; the policy only looks at the kind and status code to decide
//! whether another attempt is worth making and how long to wait first.

pub mod backoff;
mod policy;
mod run;

pub use policy::{RetryConfig, RetryDecision, RetryPolicy, DEFAULT_RETRYABLE_STATUS_CODES};
pub use run::run_with_retry;
