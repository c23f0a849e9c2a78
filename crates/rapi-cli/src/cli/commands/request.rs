//! `rapi get|post|put|delete` – one resilient API call.

use crate::cli::RequestArgs;
use anyhow::{bail, Result};
use rapi_core::config::RapiConfig;
use rapi_core::logging::redact_params;
use rapi_core::transport::Method;
use rapi_core::{Params, ResilientClient};

/// Prints the JSON body on success or the error payload on failure.
/// Returns whether the call succeeded.
pub fn run_request(cfg: &RapiConfig, method: Method, args: RequestArgs) -> Result<bool> {
    let client = ResilientClient::from_config(cfg)?;
    let params = collect_params(args.params)?;
    tracing::debug!(
        "{} {} params={:?}",
        method.as_str(),
        args.path,
        redact_params(&params)
    );

    match client.execute(method, &args.path, &params) {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(true)
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.to_error_response())?);
            Ok(false)
        }
    }
}

/// Gather `-p` pairs; a key given twice is an error rather than last-wins.
pub fn collect_params(pairs: Vec<(String, String)>) -> Result<Params> {
    let mut params = Params::new();
    for (key, value) in pairs {
        if params.contains_key(&key) {
            bail!("parameter `{}` given more than once", key);
        }
        params.insert(key, value);
    }
    Ok(params)
}
