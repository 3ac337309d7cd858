use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapters::{settle, Fetched};
use crate::classify::{classify, Outcome};
use crate::error::ClassifiedError;
use crate::executor::RequestExecutor;
use crate::http_client::HttpAuth;
use crate::provider::ProviderId;
use crate::request::{RequestDescriptor, RequestOptions};

/// USD-anchored sample rates used when the provider is unavailable.
const SAMPLE_USD_RATES: [(&str, f64); 11] = [
    ("USD", 1.0),
    ("AED", 3.6725),
    ("AUD", 1.52),
    ("CAD", 1.36),
    ("CNY", 7.2),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("INR", 83.0),
    ("JPY", 150.0),
    ("SAR", 3.75),
    ("SGD", 1.34),
];

/// Conversion table relative to `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub rates: BTreeMap<String, f64>,
}

impl ExchangeRates {
    /// Converts `amount` of the base currency into `currency`.
    pub fn convert(&self, amount: f64, currency: &str) -> Option<f64> {
        self.rates
            .get(&currency.to_ascii_uppercase())
            .map(|rate| amount * rate)
    }

    /// Keeps only the listed currencies; an empty list keeps everything.
    pub fn retain_symbols(&mut self, symbols: &[String]) {
        if symbols.is_empty() {
            return;
        }
        let wanted: Vec<String> = symbols.iter().map(|s| s.to_ascii_uppercase()).collect();
        self.rates.retain(|code, _| wanted.contains(code));
    }

    fn sample(base: &str) -> Self {
        let usd: BTreeMap<&str, f64> = SAMPLE_USD_RATES.into_iter().collect();
        let rates = match usd.get(base) {
            Some(base_per_usd) => usd
                .iter()
                .map(|(code, per_usd)| ((*code).to_owned(), per_usd / base_per_usd))
                .collect(),
            None => BTreeMap::from([(base.to_owned(), 1.0)]),
        };
        Self {
            base: base.to_owned(),
            date: None,
            rates,
        }
    }
}

/// Latest exchange rates, `GET {base_url}/latest/{BASE}`.
#[derive(Debug, Clone)]
pub struct ExchangeRateAdapter {
    executor: RequestExecutor,
    options: RequestOptions,
}

impl ExchangeRateAdapter {
    pub fn new(executor: RequestExecutor) -> Self {
        Self {
            executor,
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn latest(&self, base: &str) -> Result<Fetched<ExchangeRates>, ClassifiedError> {
        let base = parse_currency(base)?;
        let config = self.executor.config();

        if !config.is_real_data_enabled() {
            return Ok(Fetched::demo(
                ExchangeRates::sample(&base),
                ProviderId::ExchangeRate,
            ));
        }

        let mut descriptor = RequestDescriptor::get(format!(
            "{}/latest/{}",
            config.base_url(ProviderId::ExchangeRate),
            base
        ));
        if let Some(key) = config.api_key(ProviderId::ExchangeRate) {
            descriptor = descriptor.with_auth(&HttpAuth::BearerToken(key));
        }

        let result = self
            .executor
            .execute_accepting(&descriptor, &self.options, |table: &ExchangeRates| {
                if table.rates.is_empty() {
                    Err(Outcome::empty(format!("no rates returned for {base}")))
                } else {
                    Ok(())
                }
            })
            .await;

        settle(config, ProviderId::ExchangeRate, result, || {
            ExchangeRates::sample(&base)
        })
    }
}

fn parse_currency(raw: &str) -> Result<String, ClassifiedError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|ch| ch.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(classify(Outcome::configuration(format!(
            "currency must be a 3-letter ISO code: '{}'",
            raw.trim()
        ))))
    }
}
