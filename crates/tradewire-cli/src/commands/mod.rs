mod cache_key;
mod config;
mod pincode;
mod rates;

use std::sync::Arc;

use tradewire_core::{
    ProviderId, RequestExecutor, RequestOptions, ReqwestHttpClient, ServiceConfig,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Report;

pub async fn run(cli: &Cli, config: Arc<ServiceConfig>) -> Result<Report, CliError> {
    let options = RequestOptions::default()
        .with_timeout_ms(cli.timeout_ms)
        .with_max_retries(cli.max_retries);

    match &cli.command {
        Command::Rates(args) => {
            rates::run(args, executor(ProviderId::ExchangeRate, config), options).await
        }
        Command::Pincode(args) => {
            pincode::run(args, executor(ProviderId::IndiaPost, config), options).await
        }
        Command::CacheKey(args) => cache_key::run(args),
        Command::Config => config::run(&config),
    }
}

fn executor(source: ProviderId, config: Arc<ServiceConfig>) -> RequestExecutor {
    RequestExecutor::new(source, Arc::new(ReqwestHttpClient::new()), config)
}
