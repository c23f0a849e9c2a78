//! Resilient API client: rate limiting, retries and error classification
//! around a bare [`Transport`].
//!
//! Every verb routes through [`ResilientClient::execute`]:
//! fail fast on a missing key, take a rate-limit token (may block), then run
//! the retry loop around one transport call whose outcome is classified into
//! either the parsed JSON body or an [`ApiError`].

mod classify;
mod request;


pub use classify::{classify_response, classify_transport_error, snippet, RESPONSE_SNIPPET_CHARS};
pub use request::join_endpoint;

use crate::clock::{Clock, SystemClock};
use crate::config::RapiConfig;
use crate::error::ApiError;
use crate::logging::{redact_headers_with, redact_url_with};
use crate::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::retry::{run_with_retry, RetryConfig, RetryPolicy};
use crate::transport::{CurlTransport, HttpRequest, Method, Transport};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Query parameters (GET/DELETE) or JSON body fields (POST/PUT).
pub type Params = BTreeMap<String, String>;

/// Where the credential travels on each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPlacement {
    #[default]
    Header,
    /// Named query parameter, on every verb (POST/PUT included).
    Query,
}

/// API credential attached to every request, as a header or a query parameter.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
    pub placement: KeyPlacement,
}

impl AuthHeader {
    /// Sent as the header `name: value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            placement: KeyPlacement::Header,
        }
    }

    /// Sent as the query parameter `?name=value`.
    pub fn query(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            placement: KeyPlacement::Query,
            ..Self::new(name, value)
        }
    }

    /// `X-Api-Key: <value>`.
    pub fn api_key(value: impl Into<String>) -> Self {
        Self::new("X-Api-Key", value)
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &crate::logging::REDACTED)
            .field("placement", &self.placement)
            .finish()
    }
}

/// Client for one upstream API. Cheap to share behind `Arc` across threads.
pub struct ResilientClient {
    base_url: String,
    provider: String,
    transport: Arc<dyn Transport>,
    rate_limiter: Option<Arc<RateLimiter>>,
    retry: RetryPolicy,
    auth: Option<AuthHeader>,
    require_api_key: bool,
    clock: Arc<dyn Clock>,
}

impl ResilientClient {
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Client with an optional limiter, optional retries (none when `retry` is
    /// `None`) and an optional auth header.
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        rate_limit: Option<RateLimiterConfig>,
        retry: Option<RetryConfig>,
        auth: Option<AuthHeader>,
    ) -> Result<Self> {
        let mut builder = ClientBuilder::new(base_url).transport(transport);
        if let Some(cfg) = rate_limit {
            builder = builder.rate_limit(cfg);
        }
        if let Some(cfg) = retry {
            builder = builder.retry(cfg);
        }
        if let Some(auth) = auth {
            builder = builder.auth(auth);
        }
        builder.build()
    }

    /// Client wired from a loaded config file, with the key read from the
    /// environment variable named by `api_key_env`.
    pub fn from_config(cfg: &RapiConfig) -> Result<Self> {
        let transport =
            CurlTransport::new(cfg.timeout()?).with_connect_timeout(cfg.connect_timeout()?);
        let mut builder = ClientBuilder::new(cfg.base_url.clone())
            .transport(Arc::new(transport))
            .retry(cfg.retry_config()?)
            .require_api_key(cfg.require_api_key);
        if let Some(rate_limit) = cfg.rate_limiter_config()? {
            builder = builder.rate_limit(rate_limit);
        }
        if let Some(key) = cfg.api_key() {
            let auth = match &cfg.api_key_query_param {
                Some(param) => AuthHeader::query(param.clone(), key),
                None => AuthHeader::new(cfg.api_key_header.clone(), key),
            };
            builder = builder.auth(auth);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.auth.is_some()
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn get(&self, path: &str, params: &Params) -> Result<Value, ApiError> {
        self.execute(Method::Get, path, params)
    }

    pub fn post(&self, path: &str, params: &Params) -> Result<Value, ApiError> {
        self.execute(Method::Post, path, params)
    }

    pub fn put(&self, path: &str, params: &Params) -> Result<Value, ApiError> {
        self.execute(Method::Put, path, params)
    }

    pub fn delete(&self, path: &str, params: &Params) -> Result<Value, ApiError> {
        self.execute(Method::Delete, path, params)
    }

    /// The single call path shared by all verbs.
    pub fn execute(&self, method: Method, path: &str, params: &Params) -> Result<Value, ApiError> {
        if self.require_api_key && self.auth.is_none() {
            tracing::error!("{} {}: API key is missing for {}", method.as_str(), path, self.provider);
            return Err(ApiError::missing_api_key(self.provider.clone()));
        }

        let request =
            request::build_request(&self.base_url, method, path, params, self.auth.as_ref())?;
        let log_url = redact_url_with(&request.url, &self.secret_names());
        let operation = format!("{} {}", method.as_str(), log_url);

        // Advisory for blocking callers: a failed acquire still sends the request.
        if let Some(limiter) = &self.rate_limiter {
            if !limiter.acquire(1, true) {
                tracing::warn!("{}: rate limit exhausted, sending anyway", operation);
            }
        }

        run_with_retry(&self.retry, self.clock.as_ref(), &operation, || {
            self.attempt(&request, &log_url)
        })
    }

    fn attempt(&self, request: &HttpRequest, log_url: &str) -> Result<Value, ApiError> {
        let method = request.method.as_str();
        tracing::debug!(
            method,
            url = %log_url,
            headers = ?redact_headers_with(&request.headers, &self.secret_names()),
            "api request"
        );
        let started = Instant::now();

        let outcome = match self.transport.send(request) {
            Ok(resp) => {
                tracing::info!(
                    method,
                    url = %log_url,
                    status = resp.status,
                    duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "api response"
                );
                classify_response(resp, log_url)
            }
            Err(e) => Err(classify_transport_error(e, log_url)),
        };

        if let Err(e) = &outcome {
            tracing::error!(
                method,
                url = %log_url,
                kind = %e.kind,
                status = ?e.status_code,
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                "api request failed: {}",
                e
            );
        }
        outcome
    }

    /// Names whose values are hidden in logs and error details beyond the
    /// built-in sensitive list.
    fn secret_names(&self) -> Vec<&str> {
        self.auth.iter().map(|a| a.name.as_str()).collect()
    }
}

impl fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("base_url", &self.base_url)
            .field("rate_limiter", &self.rate_limiter)
            .field("retry", &self.retry)
            .field("auth", &self.auth)
            .field("require_api_key", &self.require_api_key)
            .finish()
    }
}

/// Step-by-step construction of a [`ResilientClient`].
///
/// Defaults: curl transport with a 30s timeout, system clock, no rate limiter,
/// no retries, no auth header.
pub struct ClientBuilder {
    base_url: String,
    transport: Option<Arc<dyn Transport>>,
    rate_limit: Option<RateLimiterConfig>,
    shared_limiter: Option<Arc<RateLimiter>>,
    retry: RetryConfig,
    auth: Option<AuthHeader>,
    require_api_key: bool,
    clock: Option<Arc<dyn Clock>>,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            transport: None,
            rate_limit: None,
            shared_limiter: None,
            retry: RetryConfig::disabled(),
            auth: None,
            require_api_key: false,
            clock: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Give this client its own bucket.
    pub fn rate_limit(mut self, cfg: RateLimiterConfig) -> Self {
        self.rate_limit = Some(cfg);
        self
    }

    /// Draw from a bucket shared with other clients. Takes precedence over `rate_limit`.
    pub fn shared_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.shared_limiter = Some(limiter);
        self
    }

    pub fn retry(mut self, cfg: RetryConfig) -> Self {
        self.retry = cfg;
        self
    }

    /// An empty header value counts as no key.
    pub fn auth(mut self, auth: AuthHeader) -> Self {
        self.auth = Some(auth).filter(|a| !a.value.trim().is_empty());
        self
    }

    /// Fail every call with `MissingApiKey` when no key is configured.
    pub fn require_api_key(mut self, required: bool) -> Self {
        self.require_api_key = required;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        let parsed = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid base URL: {}", self.base_url))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("base URL cannot carry endpoint paths: {}", self.base_url);
        }
        let provider = parsed.host_str().unwrap_or(&self.base_url).to_string();

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(CurlTransport::default()) as Arc<dyn Transport>);
        let rate_limiter = match (self.shared_limiter, self.rate_limit) {
            (Some(shared), _) => Some(shared),
            (None, Some(cfg)) => Some(Arc::new(
                RateLimiter::with_clock(cfg, Arc::clone(&clock)).context("rate limit config")?,
            )),
            (None, None) => None,
        };
        let retry = RetryPolicy::new(self.retry).context("retry config")?;

        if self.auth.is_none() {
            tracing::warn!(
                "no API key configured for {}; requests needing authentication will fail",
                provider
            );
        }
        tracing::info!(
            "api client initialized for {} (rate limiting: {}, max retries: {})",
            self.base_url,
            rate_limiter.is_some(),
            retry.max_retries()
        );

        Ok(ResilientClient {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            provider,
            transport,
            rate_limiter,
            retry,
            auth: self.auth,
            require_api_key: self.require_api_key,
            clock,
        })
    }
}
