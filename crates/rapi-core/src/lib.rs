//! Resilient access to third-party JSON APIs.
//!
//! A [`client::ResilientClient`] wraps a synchronous [`transport::Transport`]
//! with a token-bucket [`rate_limit::RateLimiter`], an exponential-backoff
//! [`retry::RetryPolicy`] and a classifier that turns every failure into a
//! typed [`error::ApiError`].

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use client::{AuthHeader, ClientBuilder, KeyPlacement, Params, ResilientClient};
pub use error::{ApiError, ErrorKind, ErrorResponse};
