mod cli;
mod commands;
mod error;
mod output;

use std::process::ExitCode;
use std::sync::{Arc, OnceLock};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tradewire_core::ServiceConfig;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match &cli.env_file {
        Some(path) => Arc::new(ServiceConfig::from_env_file(path)?),
        None => shared_config(),
    };
    init_tracing(cli.verbose || config.is_debug_logging());
    config.validate()?;
    debug!(config = ?config, "configuration loaded");

    let report = commands::run(&cli, config).await?;
    output::render(&report, cli.pretty)?;

    Ok(ExitCode::SUCCESS)
}

/// Process-wide configuration, read from the environment on first use.
fn shared_config() -> Arc<ServiceConfig> {
    static CONFIG: OnceLock<Arc<ServiceConfig>> = OnceLock::new();
    Arc::clone(CONFIG.get_or_init(|| Arc::new(ServiceConfig::from_env())))
}

fn init_tracing(debug_api: bool) {
    let default_directive = if debug_api {
        "info,tradewire_core=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
