use crate::error::{ApiError, ErrorKind};
use crate::retry::backoff;
use anyhow::Result;
use std::collections::BTreeSet;
use std::time::Duration;

/// Status codes retried by default: 429 and the transient 5xx family.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry parameters, fixed at client construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryConfig {
    /// A single attempt, never retried.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_delay.is_zero() {
            anyhow::bail!("retry initial_delay must be positive");
        }
        if self.max_delay < self.initial_delay {
            anyhow::bail!(
                "retry max_delay ({:?}) must not be below initial_delay ({:?})",
                self.max_delay,
                self.initial_delay
            );
        }
        if !(self.exponential_base.is_finite() && self.exponential_base > 1.0) {
            anyhow::bail!(
                "retry exponential_base must be greater than 1.0, got {}",
                self.exponential_base
            );
        }
        Ok(())
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop and surface the error.
    NoRetry,
    /// Sleep for the given delay, then try again.
    RetryAfter(Duration),
}

/// Decides whether a classified failure deserves another attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Timeouts and network failures always qualify; HTTP errors only for a
    /// configured status. Parse, auth and unknown failures never do.
    pub fn should_retry(&self, kind: ErrorKind, status_code: Option<u16>) -> bool {
        match kind {
            ErrorKind::NetworkError | ErrorKind::TimeoutError => true,
            ErrorKind::HttpError => status_code
                .is_some_and(|code| self.config.retryable_status_codes.contains(&code)),
            ErrorKind::ParseError | ErrorKind::MissingApiKey | ErrorKind::UnknownError => false,
        }
    }

    /// Backoff before the retry following `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        backoff::delay(
            attempt,
            self.config.initial_delay,
            self.config.max_delay,
            self.config.exponential_base,
        )
    }

    /// Decide what to do after `attempt` (0-based) failed with `error`.
    pub fn decide(&self, attempt: u32, error: &ApiError) -> RetryDecision {
        if attempt >= self.config.max_retries {
            return RetryDecision::NoRetry;
        }
        if !self.should_retry(error.kind, error.status_code) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay_for(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }
}
