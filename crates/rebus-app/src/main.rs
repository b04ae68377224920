#![warn(missing_docs)]
//! # rebus-app binary
//!
//! Service entry point for the REBUS risk assessment core.

use std::process::ExitCode;

use rebus_app::{PipelineConfig, app_version, init_tracing};
use tracing::{error, info};

/// CLI entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("failed to load rebus configuration: {error}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_level, config.json_logs);

    if let Err(error) = config.validate() {
        error!(%error, "invalid rebus configuration");
        return ExitCode::FAILURE;
    }

    info!(
        version = app_version(),
        "REBUS risk assessment core OPERATIONAL"
    );

    println!("rebus-app {}", app_version());
    for (name, value) in config.describe() {
        println!("{name}={value}");
    }

    ExitCode::SUCCESS
}
