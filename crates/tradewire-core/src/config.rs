//! Runtime configuration shared by the executor and the provider wrappers.
//!
//! Values are seeded once from `TRADEWIRE_*` environment variables and may be
//! overridden in memory with [`ServiceConfig::set`]. Nothing is persisted.
//!
//! | Environment variable | Key | Default |
//! |----------------------|-----|---------|
//! | `TRADEWIRE_ENABLE_REAL_DATA` | `enable_real_data` | `true` |
//! | `TRADEWIRE_FALLBACK_TO_MOCK` | `fallback_to_mock` | `true` |
//! | `TRADEWIRE_DEBUG_API` | `debug_api` | `false` |
//! | `TRADEWIRE_CACHE_TTL_HOURS` | `cache_ttl_hours` | `24` |
//! | `TRADEWIRE_<PROVIDER>_BASE_URL` | `<provider>_base_url` | provider default |
//! | `TRADEWIRE_<PROVIDER>_API_KEY` | `<provider>_api_key` | unset |

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::provider::ProviderId;

pub const ENV_PREFIX: &str = "TRADEWIRE_";

const DEFAULT_CACHE_TTL_HOURS: f64 = 24.0;
const REDACTED: &str = "<redacted>";

/// Canonical configuration keys.
pub mod keys {
    use crate::provider::ProviderId;

    pub const ENABLE_REAL_DATA: &str = "enable_real_data";
    pub const FALLBACK_TO_MOCK: &str = "fallback_to_mock";
    pub const DEBUG_API: &str = "debug_api";
    pub const CACHE_TTL_HOURS: &str = "cache_ttl_hours";

    pub fn base_url(provider: ProviderId) -> String {
        format!("{}_base_url", provider.as_str())
    }

    pub fn api_key(provider: ProviderId) -> String {
        format!("{}_api_key", provider.as_str())
    }

    pub(crate) fn is_secret(key: &str) -> bool {
        key.ends_with("_api_key")
    }
}

pub struct ServiceConfig {
    values: RwLock<BTreeMap<String, String>>,
}

impl ServiceConfig {
    /// Built-in defaults only; nothing is read from the environment.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Seeds from `TRADEWIRE_*` pairs; other names are ignored.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = name.as_ref().strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
                Some((key, value.into()))
            })
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Reads a dotenv file, letting variables already present in the
    /// process environment take precedence.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let env_file_error = |reason: String| ConfigError::EnvFile {
            path: path.display().to_string(),
            reason,
        };

        let mut vars = BTreeMap::new();
        for item in dotenvy::from_path_iter(path).map_err(|e| env_file_error(e.to_string()))? {
            let (name, value) = item.map_err(|e| env_file_error(e.to_string()))?;
            vars.insert(name, value);
        }
        vars.extend(std::env::vars());

        Ok(Self::from_vars(vars))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().insert(key.into(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn is_real_data_enabled(&self) -> bool {
        self.flag_or_default(keys::ENABLE_REAL_DATA, true)
    }

    pub fn should_fallback_to_mock(&self) -> bool {
        self.flag_or_default(keys::FALLBACK_TO_MOCK, true)
    }

    pub fn is_debug_logging(&self) -> bool {
        self.flag_or_default(keys::DEBUG_API, false)
    }

    pub fn cache_ttl(&self) -> Duration {
        match self.cache_ttl_hours() {
            Ok(hours) => hours_to_duration(hours),
            Err(error) => {
                warn!(%error, "falling back to default cache ttl");
                hours_to_duration(DEFAULT_CACHE_TTL_HOURS)
            }
        }
    }

    pub fn cache_ttl_millis(&self) -> u64 {
        u64::try_from(self.cache_ttl().as_millis()).unwrap_or(u64::MAX)
    }

    /// Configured base URL without a trailing slash, or the provider default.
    pub fn base_url(&self, provider: ProviderId) -> String {
        self.get(&keys::base_url(provider))
            .filter(|url| !url.trim().is_empty())
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .unwrap_or_else(|| provider.default_base_url().to_owned())
    }

    pub fn api_key(&self, provider: ProviderId) -> Option<String> {
        self.get(&keys::api_key(provider))
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_real_data_enabled(&self, enabled: bool) {
        self.set(keys::ENABLE_REAL_DATA, enabled.to_string());
    }

    pub fn set_fallback_to_mock(&self, enabled: bool) {
        self.set(keys::FALLBACK_TO_MOCK, enabled.to_string());
    }

    pub fn set_debug_logging(&self, enabled: bool) {
        self.set(keys::DEBUG_API, enabled.to_string());
    }

    pub fn set_cache_ttl(&self, ttl: Duration) {
        self.set(keys::CACHE_TTL_HOURS, (ttl.as_secs_f64() / 3600.0).to_string());
    }

    pub fn set_base_url(&self, provider: ProviderId, url: impl Into<String>) {
        self.set(keys::base_url(provider), url);
    }

    pub fn set_api_key(&self, provider: ProviderId, key: impl Into<String>) {
        self.set(keys::api_key(provider), key);
    }

    /// Checks every typed value so bad input is reported once at startup
    /// instead of silently defaulting later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in [keys::ENABLE_REAL_DATA, keys::FALLBACK_TO_MOCK, keys::DEBUG_API] {
            self.flag(key)?;
        }
        self.cache_ttl_hours()?;
        Ok(())
    }

    /// All stored values with API keys masked.
    pub fn redacted(&self) -> BTreeMap<String, String> {
        self.read()
            .iter()
            .map(|(key, value)| {
                let shown = if keys::is_secret(key) {
                    REDACTED.to_owned()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect()
    }

    fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|value| {
                parse_bool(&value).ok_or_else(|| ConfigError::InvalidBool {
                    key: key.to_owned(),
                    value,
                })
            })
            .transpose()
    }

    fn flag_or_default(&self, key: &str, default: bool) -> bool {
        match self.flag(key) {
            Ok(value) => value.unwrap_or(default),
            Err(error) => {
                warn!(%error, default, "using default for invalid flag");
                default
            }
        }
    }

    fn cache_ttl_hours(&self) -> Result<f64, ConfigError> {
        let Some(raw) = self.get(keys::CACHE_TTL_HOURS) else {
            return Ok(DEFAULT_CACHE_TTL_HOURS);
        };
        match raw.trim().parse::<f64>() {
            Ok(hours) if hours.is_finite() && hours >= 0.0 => Ok(hours),
            _ => Err(ConfigError::InvalidNumber {
                key: keys::CACHE_TTL_HOURS.to_owned(),
                value: raw,
            }),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ServiceConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("values", &self.redacted())
            .finish()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn hours_to_duration(hours: f64) -> Duration {
    Duration::try_from_secs_f64(hours * 3600.0).unwrap_or(Duration::MAX)
}
