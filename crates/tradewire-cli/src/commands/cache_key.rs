use serde::Serialize;
use serde_json::Value;
use tradewire_core::{derive_key, HttpMethod};

use crate::cli::CacheKeyArgs;
use crate::error::CliError;
use crate::output::Report;

#[derive(Debug, Serialize)]
struct CacheKeyData<'a> {
    method: &'static str,
    url: &'a str,
    key: String,
}

pub fn run(args: &CacheKeyArgs) -> Result<Report, CliError> {
    let method = HttpMethod::from(args.method);
    let body = args.body.as_deref().map(canonical_body).transpose()?;

    let data = CacheKeyData {
        method: method.as_str(),
        url: &args.url,
        key: derive_key(method, &args.url, body.as_deref()),
    };
    Ok(Report::new(serde_json::to_value(data)?, None))
}

/// Re-serializes the body so whitespace differences do not change the key.
fn canonical_body(raw: &str) -> Result<String, CliError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| CliError::Command(format!("--body is not valid JSON: {error}")))?;
    Ok(serde_json::to_string(&value)?)
}
