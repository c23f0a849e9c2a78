//! Map transport results onto the closed [`ErrorKind`] taxonomy.

use crate::error::{
    ApiError, ErrorKind, DETAIL_ERROR, DETAIL_RESPONSE_TEXT, DETAIL_STATUS_CODE, DETAIL_URL,
};
use crate::transport::{HttpResponse, TransportError};
use serde_json::Value;

/// Raw bodies quoted in error details are cut to this many characters.
pub const RESPONSE_SNIPPET_CHARS: usize = 500;

/// Classify a failure that happened before any status was received.
pub fn classify_transport_error(err: TransportError, url: &str) -> ApiError {
    match err {
        TransportError::Timeout(msg) => ApiError::new(ErrorKind::TimeoutError, "Request timed out")
            .with_detail(DETAIL_URL, url)
            .with_detail(DETAIL_ERROR, msg),
        TransportError::Network(msg) => {
            ApiError::new(ErrorKind::NetworkError, "Network error occurred")
                .with_detail(DETAIL_URL, url)
                .with_detail(DETAIL_ERROR, msg)
        }
        TransportError::Other(msg) => {
            ApiError::new(ErrorKind::UnknownError, "Unexpected error occurred")
                .with_detail(DETAIL_URL, url)
                .with_detail(DETAIL_ERROR, msg)
        }
    }
}

/// Turn a completed exchange into the parsed JSON body or a classified error.
///
/// Non-2xx statuses become `HttpError`. A JSON object error body is merged
/// into the details and its `message` field, when a string, replaces the
/// default `HTTP <code> error`. A 2xx body that is not JSON is a `ParseError`.
pub fn classify_response(resp: HttpResponse, url: &str) -> Result<Value, ApiError> {
    let status = resp.status;
    if !resp.is_success() {
        let mut err = ApiError::new(ErrorKind::HttpError, format!("HTTP {} error", status))
            .with_detail(DETAIL_URL, url);
        match serde_json::from_slice::<Value>(&resp.body) {
            Ok(Value::Object(body)) => {
                if let Some(Value::String(message)) = body.get("message") {
                    err.message = message.clone();
                }
                for (k, v) in body {
                    if k != DETAIL_STATUS_CODE {
                        err.details.insert(k, v);
                    }
                }
            }
            Ok(_) => {}
            Err(_) => {
                err = err.with_detail(DETAIL_RESPONSE_TEXT, snippet(&resp.text()));
            }
        }
        return Err(err.with_status(status));
    }

    serde_json::from_slice(&resp.body).map_err(|e| {
        ApiError::new(ErrorKind::ParseError, "Failed to parse API response")
            .with_status(status)
            .with_detail(DETAIL_URL, url)
            .with_detail(DETAIL_ERROR, e.to_string())
            .with_detail(DETAIL_RESPONSE_TEXT, snippet(&resp.text()))
    })
}

/// First [`RESPONSE_SNIPPET_CHARS`] characters of `text`.
pub fn snippet(text: &str) -> String {
    text.chars().take(RESPONSE_SNIPPET_CHARS).collect()
}
