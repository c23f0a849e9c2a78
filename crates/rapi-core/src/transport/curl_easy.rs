//! libcurl `Easy` transport. One handle per request, driven on the calling thread.

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use std::time::Duration;

/// Blocking transport backed by the curl crate.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    timeout: Duration,
    connect_timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl CurlTransport {
    /// `timeout` bounds one whole attempt; the connect phase is capped at 15s.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: Duration::from_secs(15).min(timeout),
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn perform(&self, request: &HttpRequest) -> Result<(u32, Vec<u8>), curl::Error> {
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&request.url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;

        match request.method {
            Method::Get => easy.get(true)?,
            Method::Post => easy.post(true)?,
            Method::Put => {
                easy.post(true)?;
                easy.custom_request("PUT")?;
            }
            Method::Delete => easy.custom_request("DELETE")?,
        }
        if request.method.sends_body() {
            easy.post_fields_copy(request.body.as_deref().unwrap_or_default())?;
        }

        let mut list = curl::easy::List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !request.headers.is_empty() {
            easy.http_headers(list)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        Ok((code, body))
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let (code, body) = self.perform(request).map_err(|e| classify_curl_error(&e))?;
        let status = u16::try_from(code)
            .ok()
            .filter(|s| *s >= 100)
            .ok_or_else(|| TransportError::Other(format!("invalid HTTP status {}", code)))?;
        Ok(HttpResponse { status, body })
    }
}

/// Map a curl error onto the transport taxonomy.
pub fn classify_curl_error(e: &curl::Error) -> TransportError {
    let msg = e.to_string();
    if e.is_operation_timedout() {
        return TransportError::Timeout(msg);
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_ssl_connect_error()
    {
        return TransportError::Network(msg);
    }
    TransportError::Other(msg)
}
