//! Request descriptors, per-call options and cache-key derivation.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cache::CacheMode;
use crate::classify::{classify, Outcome};
use crate::error::ClassifiedError;
use crate::http_client::{HttpAuth, HttpMethod, HttpRequest};

/// One logical outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    url: String,
    body: Option<String>,
    headers: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Builds a request whose body is `body` serialized as JSON.
    pub fn with_json<T: Serialize>(
        method: HttpMethod,
        url: impl Into<String>,
        body: &T,
    ) -> Result<Self, ClassifiedError> {
        let body = serde_json::to_string(body).map_err(|error| {
            classify(Outcome::configuration(format!(
                "request body could not be serialized: {error}"
            )))
        })?;
        Ok(Self {
            body: Some(body),
            ..Self::new(method, url)
        })
    }

    /// Appends URL-encoded query parameters.
    pub fn with_query<'a>(mut self, params: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let encoded: Vec<String> = params
            .into_iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect();
        if encoded.is_empty() {
            return self;
        }

        let separator = if self.url.contains('?') { '&' } else { '?' };
        self.url = format!("{}{}{}", self.url, separator, encoded.join("&"));
        self
    }

    /// Headers do not take part in cache-key derivation.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn body_hash(&self) -> String {
        self.body.as_deref().map(hash_body).unwrap_or_default()
    }

    /// Deterministic cache key for this descriptor. See [`derive_key`].
    pub fn cache_key(&self) -> String {
        derive_key(self.method, &self.url, self.body.as_deref())
    }

    pub(crate) fn validate(&self) -> Result<(), ClassifiedError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(classify(Outcome::configuration("request url is empty")));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(classify(Outcome::configuration(format!(
                "request url must be absolute http(s): '{url}'"
            ))));
        }
        Ok(())
    }

    pub(crate) fn to_http_request(&self, timeout: Duration) -> HttpRequest {
        let mut request = HttpRequest::new(self.method, self.url.clone())
            .with_timeout_ms(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        if let Some(body) = &self.body {
            request = request.with_body(body.clone());
        }
        request
    }
}

/// Cache key `METHOD_url_bodyhash`.
///
/// The body hash is the first 16 hex digits of the SHA-256 of the serialized
/// body, and empty when there is no body, so `GET /foo` maps to `GET_/foo_`.
/// Identical inputs always give identical keys.
pub fn derive_key(method: HttpMethod, url: &str, body: Option<&str>) -> String {
    let body_hash = body.map(hash_body).unwrap_or_default();
    format!("{}_{}_{}", method.as_str(), url, body_hash)
}

fn hash_body(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    hex::encode(&digest[..8])
}

/// Per-call knobs for [`crate::RequestExecutor::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Duration,
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Only consulted for read methods.
    pub cache: CacheMode,
    /// Overrides the configured cache TTL for this call.
    pub cache_ttl: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_retries: 3,
            cache: CacheMode::Use,
            cache_ttl: None,
        }
    }
}

impl RequestOptions {
    /// Single attempt, no cache. Use for non-idempotent writes.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            cache: CacheMode::Bypass,
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.cache = if enabled {
            CacheMode::Use
        } else {
            CacheMode::Bypass
        };
        self
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache = mode;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}
