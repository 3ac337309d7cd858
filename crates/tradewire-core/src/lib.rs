//! # Tradewire Core
//!
//! Request core shared by the tradewire trade-intelligence provider wrappers.
//!
//! ## Overview
//!
//! Every outbound call to a public data provider (UN Comtrade, World Bank,
//! OpenCorporates, India Post, IFSC, exchange rates) goes through one
//! [`RequestExecutor`], which gives it:
//!
//! - **Response caching** with per-entry TTL and pattern invalidation
//! - **Timeouts** on each transport attempt
//! - **Retries** with exponential backoff for transient failures
//! - **Error classification** into a fixed taxonomy of [`ErrorKind`]s
//! - **A uniform envelope** ([`ApiResponse`]) around successful payloads
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider wrappers with demo and fallback data |
//! | [`cache`] | TTL cache store and statistics |
//! | [`classify`] | Maps raw failure outcomes to classified errors |
//! | [`clock`] | Injectable time source |
//! | [`config`] | Runtime service configuration |
//! | [`envelope`] | Response envelope and timestamps |
//! | [`error`] | Error taxonomy |
//! | [`executor`] | Cached, retrying request execution |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`provider`] | Provider identifiers |
//! | [`request`] | Request descriptors, options, cache keys |
//! | [`retry`] | Backoff schedules |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tradewire_core::{
//!     ProviderId, RequestDescriptor, RequestExecutor, RequestOptions, ReqwestHttpClient,
//!     ServiceConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(ServiceConfig::from_env());
//!     let executor = RequestExecutor::new(
//!         ProviderId::WorldBank,
//!         Arc::new(ReqwestHttpClient::new()),
//!         Arc::clone(&config),
//!     );
//!
//!     let descriptor = RequestDescriptor::get(format!(
//!         "{}/country/IND/indicator/NY.GDP.MKTP.CD",
//!         config.base_url(ProviderId::WorldBank)
//!     ))
//!     .with_query([("format", "json")]);
//!
//!     let response = executor
//!         .execute::<serde_json::Value>(&descriptor, &RequestOptions::default())
//!         .await?;
//!     println!("cached: {}", response.cached);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Provider Wrapper│──── fallback ───▶ sample data + DataNotice
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ RequestExecutor │────▶│ CacheStore       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ HttpClient      │────▶│ classify()       │
//! │ (reqwest)       │     │ ErrorKind        │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Expected failures are values, never panics:
//!
//! ```rust
//! use tradewire_core::{ClassifiedError, ErrorKind};
//!
//! fn describe(error: &ClassifiedError) -> &'static str {
//!     match error.kind() {
//!         ErrorKind::RateLimited => "slow down",
//!         ErrorKind::Unauthorized => "check the API key",
//!         ErrorKind::NotFound | ErrorKind::NoData => "nothing to show",
//!         _ if error.retryable() => "temporary problem",
//!         _ => "request failed",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys live in [`ServiceConfig`] and are redacted from `Debug` output
//! - Query strings are stripped from logged URLs
//! - Provider calls use HTTPS base URLs by default

pub mod adapters;
pub mod cache;
pub mod classify;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod http_client;
pub mod provider;
pub mod request;
pub mod retry;

// Provider wrappers
pub use adapters::{
    Confidence, DataNotice, ExchangeRateAdapter, ExchangeRates, Fetched, PincodeDetails,
    PostOffice, PostalLookupAdapter,
};

// Caching
pub use cache::{CacheMode, CacheStats, CacheStore};

// Classification
pub use classify::{classify, kind_for_status, Outcome};

// Time
pub use clock::{Clock, ManualClock, SystemClock};

// Configuration
pub use config::ServiceConfig;

// Envelope types
pub use envelope::{ApiResponse, Timestamp};

// Error types
pub use error::{ClassifiedError, ConfigError, ErrorKind};

// Execution
pub use executor::{ExecutorStats, RequestExecutor, RequestExecutorBuilder};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient, TransportError,
};

// Provider identifiers
pub use provider::ProviderId;

// Requests
pub use request::{derive_key, RequestDescriptor, RequestOptions};

// Retry logic
pub use retry::Backoff;
