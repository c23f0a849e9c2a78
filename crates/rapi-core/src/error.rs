//! Typed failure values returned by every client call.
//!
//! Every non-success path through [`crate::client::ResilientClient`] ends in
//! exactly one [`ApiError`] whose [`ErrorKind`] is drawn from a closed set.
//! Transport-specific error types never cross this boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Detail key holding the HTTP status code.
pub const DETAIL_STATUS_CODE: &str = "status_code";
/// Detail key holding the requested URL (query secrets redacted).
pub const DETAIL_URL: &str = "url";
/// Detail key holding the first characters of an unparseable body.
pub const DETAIL_RESPONSE_TEXT: &str = "response_text";
/// Detail key holding the underlying error message.
pub const DETAIL_ERROR: &str = "error";

/// Closed taxonomy of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    HttpError,
    TimeoutError,
    NetworkError,
    ParseError,
    MissingApiKey,
    UnknownError,
}

impl ErrorKind {
    /// Identifier used in [`ErrorResponse::error`].
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::HttpError => "http_error",
            ErrorKind::TimeoutError => "timeout_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::MissingApiKey => "missing_api_key",
            ErrorKind::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified API failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status_code: Option<u16>,
    pub kind: ErrorKind,
    pub details: Map<String, Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            kind,
            details: Map::new(),
        }
    }

    /// Set the status code; it is mirrored into `details` so renderers find it there.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self.details
            .insert(DETAIL_STATUS_CODE.to_string(), Value::from(status));
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingApiKey, "API key is missing")
            .with_status(401)
            .with_detail("provider", provider.into())
    }

    /// Shape consumed by error handlers building user-facing responses.
    pub fn to_error_response(&self) -> ErrorResponse {
        let mut details = self.details.clone();
        if let Some(code) = self.status_code {
            details.insert(DETAIL_STATUS_CODE.to_string(), Value::from(code));
        }
        ErrorResponse {
            error: self.kind.as_str().to_string(),
            message: self.message.clone(),
            details,
            status_code: self.status_code,
        }
    }
}

/// Serializable error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}
