//! CLI for issuing resilient API calls.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rapi_core::config::{self, RapiConfig};
use rapi_core::transport::Method;
use std::path::PathBuf;

use commands::{run_config, run_request};

/// Top-level CLI for rapi.
#[derive(Debug, Parser)]
#[command(name = "rapi")]
#[command(about = "rapi: rate-limited, retrying JSON API client", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/rapi/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Endpoint path plus parameters shared by every verb.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Endpoint path, appended to the configured base URL.
    pub path: String,

    /// Query parameter (GET/DELETE) or JSON body field (POST/PUT). Repeatable.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send a GET request.
    Get(RequestArgs),
    /// Send a POST request with a JSON body.
    Post(RequestArgs),
    /// Send a PUT request with a JSON body.
    Put(RequestArgs),
    /// Send a DELETE request.
    Delete(RequestArgs),
    /// Show the config file path and the effective configuration.
    Config,
}

/// Parse `key=value`; the value may itself contain `=`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{}`", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn load_config(path: Option<&PathBuf>) -> Result<RapiConfig> {
    match path {
        Some(p) => config::load_from(p),
        None => config::load_or_init(),
    }
}

impl CliCommand {
    /// Ok(false) when the API call failed and its error was printed.
    pub fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();
        let cfg = load_config(cli.config.as_ref())?;
        tracing::debug!("loaded config for {}", cfg.base_url);

        let ok = match cli.command {
            CliCommand::Get(args) => run_request(&cfg, Method::Get, args)?,
            CliCommand::Post(args) => run_request(&cfg, Method::Post, args)?,
            CliCommand::Put(args) => run_request(&cfg, Method::Put, args)?,
            CliCommand::Delete(args) => run_request(&cfg, Method::Delete, args)?,
            CliCommand::Config => {
                run_config(&cfg, cli.config.as_deref())?;
                true
            }
        };
        Ok(ok)
    }
}
