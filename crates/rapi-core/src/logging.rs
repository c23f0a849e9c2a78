//! Logging init (file under XDG state dir, or stderr) and secret redaction.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Replacement for secret values in logs and error details.
pub const REDACTED: &str = "***REDACTED***";

/// Parameter and header names whose values must never be logged.
const SENSITIVE_KEYS: [&str; 8] = [
    "api_key",
    "key",
    "apikey",
    "x-api-key",
    "authorization",
    "password",
    "token",
    "appid",
];

const DEFAULT_FILTER: &str = "info,rapi=debug";

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

/// Initialize structured logging to `~/.local/state/rapi/rapi.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rapi")?;
    let log_dir = xdg_dirs.get_state_home();

    fs::create_dir_all(&log_dir)?;
    let log_file_path: PathBuf = log_dir.join("rapi.log");

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    struct FileMakeWriter(std::fs::File);

    impl<'a> MakeWriter<'a> for FileMakeWriter {
        type Writer = FileOrStderr;

        fn make_writer(&'a self) -> Self::Writer {
            self.0
                .try_clone()
                .map(FileOrStderr::File)
                .unwrap_or(FileOrStderr::Stderr)
        }
    }

    let writer = BoxMakeWriter::new(FileMakeWriter(file));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {}", e))?;

    tracing::info!("rapi logging initialized at {}", log_file_path.display());

    Ok(())
}

/// Initialize logging to stderr only. Use when `init_logging()` fails so the CLI still runs.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// True when `key` names a credential (case-insensitive).
pub fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(key.trim()))
}

/// Copy of `params` with credential values replaced.
pub fn redact_params(params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| {
            let v = if is_sensitive(k) { REDACTED } else { v.as_str() };
            (k.clone(), v.to_string())
        })
        .collect()
}

/// Copy of `headers` with credential values replaced.
pub fn redact_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    redact_headers_with(headers, &[])
}

/// Like [`redact_headers`], also hiding the headers named in `extra`.
pub fn redact_headers_with(headers: &[(String, String)], extra: &[&str]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            let v = if is_secret(k, extra) { REDACTED } else { v.as_str() };
            (k.clone(), v.to_string())
        })
        .collect()
}

/// `url` with credential query values replaced. Unparseable input is returned as is.
pub fn redact_url(raw: &str) -> String {
    redact_url_with(raw, &[])
}

/// Like [`redact_url`], also hiding the query parameters named in `extra`.
pub fn redact_url_with(raw: &str, extra: &[&str]) -> String {
    let Ok(mut parsed) = url::Url::parse(raw) else {
        return raw.to_string();
    };
    let has_secret = parsed.query_pairs().any(|(k, _)| is_secret(&k, extra));
    if !has_secret {
        return raw.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let v = if is_secret(&k, extra) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.into()
}

fn is_secret(key: &str, extra: &[&str]) -> bool {
    is_sensitive(key) || extra.iter().any(|e| e.eq_ignore_ascii_case(key.trim()))
}
