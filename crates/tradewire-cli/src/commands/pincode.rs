use tradewire_core::{PostalLookupAdapter, RequestExecutor, RequestOptions};

use crate::cli::PincodeArgs;
use crate::error::CliError;
use crate::output::Report;

pub async fn run(
    args: &PincodeArgs,
    executor: RequestExecutor,
    options: RequestOptions,
) -> Result<Report, CliError> {
    let mut fetched = PostalLookupAdapter::new(executor)
        .with_options(options)
        .lookup(&args.pincode)
        .await?;

    let notice = fetched.notice.take();
    Ok(Report::new(serde_json::to_value(&fetched)?, notice))
}
