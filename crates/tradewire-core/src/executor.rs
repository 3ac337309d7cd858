//! Cached, timeout-bounded, retrying execution of one logical request.
//!
//! ```text
//! Idle ─▶ CacheCheck ──hit──▶ Done
//!             │ miss
//!             ▼
//!         Transport ──ok──▶ Store ─▶ Done
//!             │ failure
//!             ▼
//!          Classify ──not retryable / budget spent──▶ Fail
//!             │ retryable
//!             ▼
//!        BackoffWait ─▶ Transport
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::classify::{classify, Outcome};
use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::envelope::{ApiResponse, Timestamp};
use crate::error::ClassifiedError;
use crate::http_client::{HttpClient, HttpResponse};
use crate::provider::ProviderId;
use crate::request::{RequestDescriptor, RequestOptions};
use crate::retry::Backoff;

#[derive(Debug, Default)]
struct ExecutorCounters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    transport_attempts: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
}

/// Counters since the executor was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutorStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub transport_attempts: u64,
    pub retries: u64,
    pub failures: u64,
}

/// Executes requests against one provider.
///
/// Cloning is cheap and clones share the cache, counters and transport.
#[derive(Clone)]
pub struct RequestExecutor {
    source: ProviderId,
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore<Value>,
    config: Arc<ServiceConfig>,
    clock: Arc<dyn Clock>,
    backoff: Backoff,
    counters: Arc<ExecutorCounters>,
}

impl RequestExecutor {
    pub fn new(
        source: ProviderId,
        http_client: Arc<dyn HttpClient>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        RequestExecutorBuilder::new(source, http_client, config).build()
    }

    pub fn builder(
        source: ProviderId,
        http_client: Arc<dyn HttpClient>,
        config: Arc<ServiceConfig>,
    ) -> RequestExecutorBuilder {
        RequestExecutorBuilder::new(source, http_client, config)
    }

    pub const fn source(&self) -> ProviderId {
        self.source
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore<Value> {
        &self.cache
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            transport_attempts: self.counters.transport_attempts.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Runs `descriptor` to completion.
    ///
    /// Expected failures (network, timeout, HTTP status, undecodable body)
    /// come back as a [`ClassifiedError`] once retries are exhausted or the
    /// error is not retryable.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        options: &RequestOptions,
    ) -> Result<ApiResponse<T>, ClassifiedError> {
        self.execute_accepting(descriptor, options, |_: &T| Ok(())).await
    }

    /// Like [`Self::execute`], but a decoded payload must pass `accept`
    /// before it is cached or returned.
    ///
    /// A rejection is classified like any other failure, so a payload the
    /// caller considers empty never occupies the cache.
    pub async fn execute_accepting<T, F>(
        &self,
        descriptor: &RequestDescriptor,
        options: &RequestOptions,
        accept: F,
    ) -> Result<ApiResponse<T>, ClassifiedError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), Outcome>,
    {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        let result = self.run(descriptor, options, &accept).await;
        if result.is_err() {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn run<T, F>(
        &self,
        descriptor: &RequestDescriptor,
        options: &RequestOptions,
        accept: &F,
    ) -> Result<ApiResponse<T>, ClassifiedError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), Outcome>,
    {
        descriptor.validate()?;

        let cacheable = descriptor.method().is_read();
        let key = descriptor.cache_key();
        let url = loggable_url(descriptor.url());

        if cacheable && options.cache.reads() {
            let cached = self
                .cache
                .get_with(&key, |value| match T::deserialize(value) {
                    Ok(data) => Some(data),
                    Err(error) => {
                        let fault = classify(Outcome::Cache {
                            detail: error.to_string(),
                        });
                        warn!(
                            source = %self.source,
                            url,
                            kind = %fault.kind(),
                            error = %fault,
                            "evicting cached payload that does not fit the requested type"
                        );
                        None
                    }
                })
                .await;
            if let Some(data) = cached {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(source = %self.source, url, "cache hit");
                return Ok(self.respond(data, true));
            }
            debug!(source = %self.source, url, "cache miss");
        }

        let request = descriptor.to_http_request(options.timeout);
        let mut attempt: u32 = 0;
        loop {
            self.counters
                .transport_attempts
                .fetch_add(1, Ordering::Relaxed);
            debug!(
                source = %self.source,
                method = %descriptor.method(),
                url,
                attempt,
                "dispatching request"
            );

            let outcome = match tokio::time::timeout(
                options.timeout,
                self.http_client.execute(request.clone()),
            )
            .await
            {
                Err(_) => Outcome::TimedOut {
                    after: options.timeout,
                },
                Ok(Err(error)) => Outcome::Transport(error),
                Ok(Ok(response)) if !response.is_success() => {
                    Outcome::status(response.status, response.reason())
                }
                Ok(Ok(response)) => match decode::<T>(&response)
                    .and_then(|(value, data)| accept(&data).map(|()| (value, data)))
                {
                    Ok((value, data)) => {
                        if cacheable && options.cache.writes() {
                            let ttl = options
                                .cache_ttl
                                .unwrap_or_else(|| self.config.cache_ttl());
                            self.cache.set(key, value, ttl).await;
                        }
                        return Ok(self.respond(data, false));
                    }
                    Err(outcome) => outcome,
                },
            };

            let error = classify(outcome);
            if !error.retryable() || attempt >= options.max_retries {
                warn!(
                    source = %self.source,
                    url,
                    kind = %error.kind(),
                    attempts = attempt + 1,
                    "request failed"
                );
                return Err(error);
            }

            let delay = self.backoff.delay(attempt);
            self.counters.retries.fetch_add(1, Ordering::Relaxed);
            warn!(
                source = %self.source,
                url,
                kind = %error.kind(),
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retrying request"
            );
            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }

    fn respond<T>(&self, data: T, cached: bool) -> ApiResponse<T> {
        ApiResponse::new(
            data,
            self.source,
            Timestamp::new(self.clock.now_utc()),
            cached,
        )
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("source", &self.source)
            .field("backoff", &self.backoff)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

pub struct RequestExecutorBuilder {
    source: ProviderId,
    http_client: Arc<dyn HttpClient>,
    config: Arc<ServiceConfig>,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<CacheStore<Value>>,
    backoff: Backoff,
}

impl RequestExecutorBuilder {
    pub fn new(
        source: ProviderId,
        http_client: Arc<dyn HttpClient>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            source,
            http_client,
            config,
            clock: None,
            cache: None,
            backoff: Backoff::default(),
        }
    }

    /// Also becomes the cache's clock unless a cache is supplied.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Shares an existing cache, e.g. one cache across several providers.
    pub fn cache(mut self, cache: CacheStore<Value>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn build(self) -> RequestExecutor {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = self
            .cache
            .unwrap_or_else(|| CacheStore::with_clock(Arc::clone(&clock)));
        RequestExecutor {
            source: self.source,
            http_client: self.http_client,
            cache,
            config: self.config,
            clock,
            backoff: self.backoff,
            counters: Arc::new(ExecutorCounters::default()),
        }
    }
}

/// Parses the body once as JSON (kept for the cache) and once into `T`.
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<(Value, T), Outcome> {
    let value = if response.body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str::<Value>(&response.body)
            .map_err(|error| Outcome::undecodable(error.to_string()))?
    };
    let data = T::deserialize(&value).map_err(|error| Outcome::undecodable(error.to_string()))?;
    Ok((value, data))
}

/// URL without its query string, which may carry credentials.
fn loggable_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;

    use super::*;
    use crate::cache::CacheMode;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use crate::http_client::{HttpMethod, ScriptedHttpClient, TransportError};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i64,
    }

    fn executor(client: Arc<ScriptedHttpClient>) -> (RequestExecutor, ManualClock) {
        let clock = ManualClock::new();
        let executor = RequestExecutor::builder(
            ProviderId::WorldBank,
            client,
            Arc::new(ServiceConfig::new()),
        )
        .clock(Arc::new(clock.clone()))
        .build();
        (executor, clock)
    }

    #[tokio::test]
    async fn success_is_wrapped_and_cached() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
            r#"{"x":1}"#,
        ))));
        let (executor, _) = executor(Arc::clone(&client));
        let descriptor = RequestDescriptor::get("https://api.test/foo");

        let first: ApiResponse<Point> = executor
            .execute(&descriptor, &RequestOptions::default())
            .await
            .expect("first call succeeds");
        let second: ApiResponse<Point> = executor
            .execute(&descriptor, &RequestOptions::default())
            .await
            .expect("second call served from cache");

        assert!(first.success);
        assert!(!first.cached);
        assert_eq!(first.source, ProviderId::WorldBank);
        assert_eq!(second.data, Point { x: 1 });
        assert!(second.cached);
        assert_eq!(client.calls(), 1);
        assert_eq!(executor.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn writes_are_never_cached() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
            r#"{"x":1}"#,
        ))));
        let (executor, _) = executor(Arc::clone(&client));
        let descriptor =
            RequestDescriptor::with_json(HttpMethod::Post, "https://api.test/leads", &[1])
                .expect("serializable");

        for _ in 0..2 {
            let _: ApiResponse<Point> = executor
                .execute(&descriptor, &RequestOptions::no_retry())
                .await
                .expect("post succeeds");
        }

        assert_eq!(client.calls(), 2);
        assert!(executor.cache().is_empty().await);
    }

    #[tokio::test]
    async fn refresh_mode_skips_cache_read_but_stores() {
        let client = Arc::new(ScriptedHttpClient::new([
            Ok(HttpResponse::ok_json(r#"{"x":1}"#)),
            Ok(HttpResponse::ok_json(r#"{"x":2}"#)),
        ]));
        let (executor, _) = executor(Arc::clone(&client));
        let descriptor = RequestDescriptor::get("https://api.test/foo");

        let _: ApiResponse<Point> = executor
            .execute(&descriptor, &RequestOptions::default())
            .await
            .expect("ok");
        let refreshed: ApiResponse<Point> = executor
            .execute(
                &descriptor,
                &RequestOptions::default().with_cache_mode(CacheMode::Refresh),
            )
            .await
            .expect("ok");
        let cached: ApiResponse<Point> = executor
            .execute(&descriptor, &RequestOptions::default())
            .await
            .expect("ok");

        assert_eq!(refreshed.data, Point { x: 2 });
        assert_eq!(cached.data, Point { x: 2 });
        assert!(cached.cached);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn cache_ttl_option_overrides_config() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
            r#"{"x":1}"#,
        ))));
        let (executor, clock) = executor(Arc::clone(&client));
        let descriptor = RequestDescriptor::get("https://api.test/foo");
        let options = RequestOptions::default().with_cache_ttl(Duration::from_millis(1000));

        let _: ApiResponse<Point> = executor.execute(&descriptor, &options).await.expect("ok");
        clock.advance(Duration::from_millis(1001));
        let _: ApiResponse<Point> = executor.execute(&descriptor, &options).await.expect("ok");

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn server_faults_back_off_exponentially() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::new(503, ""))));
        let (executor, clock) = executor(Arc::clone(&client));

        let error = executor
            .execute::<Point>(
                &RequestDescriptor::get("https://api.test/foo"),
                &RequestOptions::default(),
            )
            .await
            .expect_err("always 503");

        assert_eq!(error.kind(), ErrorKind::ServerFault);
        assert_eq!(error.status(), Some(503));
        assert_eq!(client.calls(), 4);
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        let stats = executor.stats();
        assert_eq!(stats.retries, 3);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test]
    async fn undecodable_body_fails_without_retry() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
            "<html>maintenance</html>",
        ))));
        let (executor, clock) = executor(Arc::clone(&client));

        let error = executor
            .execute::<Point>(
                &RequestDescriptor::get("https://api.test/foo"),
                &RequestOptions::default(),
            )
            .await
            .expect_err("html is not json");

        assert_eq!(error.kind(), ErrorKind::InvalidResponse);
        assert_eq!(client.calls(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn slow_transport_is_cut_off_by_timeout() {
        let client = Arc::new(
            ScriptedHttpClient::always(Ok(HttpResponse::ok_json(r#"{"x":1}"#)))
                .with_delay(Duration::from_millis(200)),
        );
        let (executor, _) = executor(Arc::clone(&client));

        let error = executor
            .execute::<Point>(
                &RequestDescriptor::get("https://api.test/foo"),
                &RequestOptions::default()
                    .with_timeout_ms(10)
                    .with_max_retries(0),
            )
            .await
            .expect_err("times out");

        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert!(error.retryable());
    }

    #[tokio::test]
    async fn invalid_descriptor_never_reaches_transport() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json("{}"))));
        let (executor, _) = executor(Arc::clone(&client));

        let error = executor
            .execute::<Value>(&RequestDescriptor::get(""), &RequestOptions::default())
            .await
            .expect_err("empty url");

        assert_eq!(error.kind(), ErrorKind::ConfigurationFault);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn connect_failure_then_success_recovers() {
        let client = Arc::new(ScriptedHttpClient::new([
            Err(TransportError::Connect(String::from("refused"))),
            Ok(HttpResponse::ok_json(r#"{"x":3}"#)),
        ]));
        let (executor, clock) = executor(Arc::clone(&client));

        let response: ApiResponse<Point> = executor
            .execute(
                &RequestDescriptor::get("https://api.test/foo"),
                &RequestOptions::default(),
            )
            .await
            .expect("second attempt succeeds");

        assert_eq!(response.data, Point { x: 3 });
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn cached_payload_of_wrong_shape_is_evicted_and_refetched() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::ok_json(
            r#"{"x":5}"#,
        ))));
        let (executor, _) = executor(Arc::clone(&client));
        let descriptor = RequestDescriptor::get("https://api.test/foo");
        executor
            .cache()
            .set(
                descriptor.cache_key(),
                serde_json::json!({"y": "wrong"}),
                Duration::from_secs(60),
            )
            .await;

        let response: ApiResponse<Point> = executor
            .execute(&descriptor, &RequestOptions::default())
            .await
            .expect("refetched from the network");

        assert_eq!(response.data, Point { x: 5 });
        assert!(!response.cached);
        assert_eq!(client.calls(), 1);
        assert_eq!(executor.stats().cache_hits, 0);
        let stats = executor.cache().stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(
            executor.cache().get(&descriptor.cache_key()).await,
            Some(serde_json::json!({"x": 5}))
        );
    }

    #[tokio::test]
    async fn rejected_payload_is_not_cached() {
        let client = Arc::new(ScriptedHttpClient::new([
            Ok(HttpResponse::ok_json(r#"{"x":0}"#)),
            Ok(HttpResponse::ok_json(r#"{"x":7}"#)),
        ]));
        let (executor, clock) = executor(Arc::clone(&client));
        let descriptor = RequestDescriptor::get("https://api.test/foo");
        let non_zero = |point: &Point| {
            if point.x == 0 {
                Err(Outcome::empty("zero point"))
            } else {
                Ok(())
            }
        };

        let error = executor
            .execute_accepting(&descriptor, &RequestOptions::default(), non_zero)
            .await
            .expect_err("zero is rejected");
        assert_eq!(error.kind(), ErrorKind::NoData);
        assert!(clock.sleeps().is_empty());
        assert!(executor.cache().is_empty().await);

        let response = executor
            .execute_accepting(&descriptor, &RequestOptions::default(), non_zero)
            .await
            .expect("second payload is accepted");
        assert_eq!(response.data, Point { x: 7 });
        assert!(!response.cached);
        assert_eq!(client.calls(), 2);
        assert_eq!(executor.stats().failures, 1);
    }

    #[tokio::test]
    async fn request_timeout_status_is_not_retried() {
        let client = Arc::new(ScriptedHttpClient::always(Ok(HttpResponse::new(
            408,
            "Request Timeout",
        ))));
        let (executor, clock) = executor(Arc::clone(&client));

        let error = executor
            .execute::<Point>(
                &RequestDescriptor::get("https://api.test/foo"),
                &RequestOptions::default(),
            )
            .await
            .expect_err("408 fails");

        assert_eq!(error.kind(), ErrorKind::InvalidResponse);
        assert_eq!(error.status(), Some(408));
        assert!(!error.retryable());
        assert_eq!(client.calls(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn query_strings_are_not_logged() {
        assert_eq!(
            loggable_url("https://api.test/latest/USD?apikey=secret"),
            "https://api.test/latest/USD"
        );
        assert_eq!(loggable_url("https://api.test/x"), "https://api.test/x");
    }
}
