//! CLI smoke entry point and one-shot request runner.
//!
//! # Responsibility
//! - With no arguments, print a deterministic linkage probe.
//! - With `METHOD PATH [BODY]`, run one request against the store named by
//!   `ORGDESK_*` configuration and print status plus JSON body.

use orgdesk_api::Api;
use orgdesk_core::{core_version, init_logging, ping, CoreConfig};
use std::process::ExitCode;

const ENV_LOG_DIR: &str = "ORGDESK_LOG_DIR";

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        println!("orgdesk_core ping={}", ping());
        println!("orgdesk_core version={}", core_version());
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            eprintln!("orgdesk: {message}");
            eprintln!("usage: orgdesk_cli [METHOD PATH [JSON_BODY]]");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the request succeeded (2xx).
fn run(args: &[String]) -> Result<bool, String> {
    let (method, path, body) = match args {
        [method, path] => (method, path, None),
        [method, path, body] => (method, path, Some(body.as_str())),
        _ => return Err(format!("expected 2 or 3 arguments, got {}", args.len())),
    };

    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Ok(log_dir) = std::env::var(ENV_LOG_DIR) {
        init_logging(&config.log_level, &log_dir).map_err(|err| err.to_string())?;
    }

    let api = Api::open(&config)?;
    let response = api.dispatch(method, path, body);
    println!("{}", response.status);
    if !response.body.is_null() {
        println!("{}", response.body);
    }
    Ok(response.is_success())
}
