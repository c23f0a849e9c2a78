use crate::rate_limit::RateLimiterConfig;
use crate::retry::{RetryConfig, DEFAULT_RETRYABLE_STATUS_CODES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rate limiting parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bucket capacity: calls allowed per window.
    pub requests_per_window: u32,
    /// Window length in seconds (3600 = per hour).
    pub window_secs: f64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 1000,
            window_secs: 3600.0,
        }
    }
}

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in seconds.
    pub initial_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: f64,
    pub exponential_base: f64,
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay_secs: 1.0,
            max_delay_secs: 60.0,
            exponential_base: 2.0,
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

/// Global configuration loaded from `~/.config/rapi/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RapiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Header the key is sent in.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Send the key as this query parameter instead of a header.
    #[serde(default)]
    pub api_key_query_param: Option<String>,
    /// Fail calls with `missing_api_key` instead of sending them unauthenticated.
    #[serde(default)]
    pub require_api_key: bool,
    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Connect-phase timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: f64,
    /// Optional rate limiting; if missing, built-in defaults are used.
    #[serde(default)]
    pub rate_limit: Option<RateLimitSection>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetrySection>,
}

impl Default for RapiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://developer.nps.gov/api/v1".to_string(),
            api_key_env: default_api_key_env(),
            api_key_header: default_api_key_header(),
            api_key_query_param: None,
            require_api_key: false,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            rate_limit: None,
            retry: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_key_env() -> String {
    "RAPI_API_KEY".to_string()
}

fn default_api_key_header() -> String {
    "X-Api-Key".to_string()
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_connect_timeout_secs() -> f64 {
    15.0
}

fn default_retryable_status_codes() -> Vec<u16> {
    DEFAULT_RETRYABLE_STATUS_CODES.to_vec()
}

fn secs(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .with_context(|| format!("{} must be a positive number of seconds, got {}", name, value))
}

impl RapiConfig {
    pub fn timeout(&self) -> Result<Duration> {
        secs("timeout_secs", self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Result<Duration> {
        secs("connect_timeout_secs", self.connect_timeout_secs)
    }

    /// `None` when the section disables rate limiting.
    pub fn rate_limiter_config(&self) -> Result<Option<RateLimiterConfig>> {
        let section = self.rate_limit.clone().unwrap_or_default();
        if !section.enabled {
            return Ok(None);
        }
        let cfg = RateLimiterConfig {
            requests_per_window: section.requests_per_window,
            window: secs("rate_limit.window_secs", section.window_secs)?,
        };
        cfg.validate()?;
        Ok(Some(cfg))
    }

    /// A disabled section yields a single-attempt policy.
    pub fn retry_config(&self) -> Result<RetryConfig> {
        let section = self.retry.clone().unwrap_or_default();
        let cfg = RetryConfig {
            max_retries: if section.enabled { section.max_retries } else { 0 },
            initial_delay: secs("retry.initial_delay_secs", section.initial_delay_secs)?,
            max_delay: secs("retry.max_delay_secs", section.max_delay_secs)?,
            exponential_base: section.exponential_base,
            retryable_status_codes: section.retryable_status_codes.into_iter().collect(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Key from the configured environment variable; empty values count as missing.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rapi")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RapiConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RapiConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<RapiConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: RapiConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
