use std::collections::BTreeMap;

use serde::Serialize;
use tradewire_core::{ProviderId, ServiceConfig};

use crate::error::CliError;
use crate::output::Report;

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    enable_real_data: bool,
    fallback_to_mock: bool,
    debug_api: bool,
    cache_ttl_ms: u64,
    providers: BTreeMap<ProviderId, ProviderView>,
    overrides: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ProviderView {
    base_url: String,
    api_key_set: bool,
}

pub fn run(config: &ServiceConfig) -> Result<Report, CliError> {
    let providers = ProviderId::ALL
        .into_iter()
        .map(|provider| {
            let view = ProviderView {
                base_url: config.base_url(provider),
                api_key_set: config.api_key(provider).is_some(),
            };
            (provider, view)
        })
        .collect();

    let effective = EffectiveConfig {
        enable_real_data: config.is_real_data_enabled(),
        fallback_to_mock: config.should_fallback_to_mock(),
        debug_api: config.is_debug_logging(),
        cache_ttl_ms: config.cache_ttl_millis(),
        providers,
        overrides: config.redacted(),
    };
    Ok(Report::new(serde_json::to_value(effective)?, None))
}
