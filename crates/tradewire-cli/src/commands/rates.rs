use tradewire_core::{ExchangeRateAdapter, RequestExecutor, RequestOptions};

use crate::cli::RatesArgs;
use crate::error::CliError;
use crate::output::Report;

pub async fn run(
    args: &RatesArgs,
    executor: RequestExecutor,
    options: RequestOptions,
) -> Result<Report, CliError> {
    let options = options.use_cache(!args.no_cache);
    let mut fetched = ExchangeRateAdapter::new(executor)
        .with_options(options)
        .latest(&args.base)
        .await?;

    fetched.data.retain_symbols(&args.symbols);
    let notice = fetched.notice.take();
    Ok(Report::new(serde_json::to_value(&fetched)?, notice))
}
