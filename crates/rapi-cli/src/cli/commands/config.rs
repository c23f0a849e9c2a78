//! `rapi config` – show where the config lives and what is in effect.

use anyhow::Result;
use rapi_core::config::{self, RapiConfig};
use std::path::Path;

pub fn run_config(cfg: &RapiConfig, explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    println!("# config: {}", path.display());
    println!(
        "# api key ({}): {}",
        cfg.api_key_env,
        if cfg.api_key().is_some() { "set" } else { "not set" }
    );
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
