//! Synchronous HTTP transport seam.
//!
//! The client only decides when a call happens and how failures are
//! classified; sending bytes is delegated to a [`Transport`]. [`CurlTransport`]
//! is the libcurl-backed implementation used in production.

mod curl_easy;

pub use curl_easy::CurlTransport;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// GET and DELETE carry params in the query string, POST and PUT in a JSON body.
    pub fn sends_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

/// One fully built request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Header `(name, value)` pairs, sent in order.
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Status and raw body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure before a status line was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connect or overall request timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Connection refused/reset, DNS failure, TLS handshake failure and similar.
    #[error("network error: {0}")]
    Network(String),
    /// Anything else (bad URL, handle setup failure, ...).
    #[error("transport error: {0}")]
    Other(String),
}

/// Sends a request on the calling thread and blocks until it completes.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
