//! Provider wrappers built on [`crate::RequestExecutor`].
//!
//! A wrapper never leaves the caller empty-handed while the configuration
//! allows fallback: a failed call degrades to locally computed data tagged
//! with a [`DataNotice`] so the UI can show a banner.

mod exchange_rate;
mod postal;

pub use exchange_rate::{ExchangeRateAdapter, ExchangeRates};
pub use postal::{Confidence, PincodeDetails, PostOffice, PostalLookupAdapter};

use serde::Serialize;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::envelope::ApiResponse;
use crate::error::{ClassifiedError, ErrorKind};
use crate::provider::ProviderId;

/// Why the data shown is not live provider data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DataNotice {
    /// Real data is switched off in configuration.
    Demo,
    /// The provider call failed and sample data was substituted.
    Fallback { kind: ErrorKind, message: String },
}

impl DataNotice {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Demo => "Demo mode",
            Self::Fallback { .. } => "Fallback Data",
        }
    }
}

/// Wrapper output: live data, or substitute data plus a notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub data: T,
    pub source: ProviderId,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<DataNotice>,
}

impl<T> Fetched<T> {
    pub fn live(response: ApiResponse<T>) -> Self {
        Self {
            data: response.data,
            source: response.source,
            cached: response.cached,
            notice: None,
        }
    }

    pub fn demo(data: T, source: ProviderId) -> Self {
        Self {
            data,
            source,
            cached: false,
            notice: Some(DataNotice::Demo),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.notice.is_some()
    }
}

/// Turns an executor result into wrapper output, substituting `fallback`
/// when allowed. Configuration faults are caller mistakes and always
/// propagate.
pub(crate) fn settle<T>(
    config: &ServiceConfig,
    source: ProviderId,
    result: Result<ApiResponse<T>, ClassifiedError>,
    fallback: impl FnOnce() -> T,
) -> Result<Fetched<T>, ClassifiedError> {
    match result {
        Ok(response) => Ok(Fetched::live(response)),
        Err(error)
            if error.kind() != ErrorKind::ConfigurationFault
                && config.should_fallback_to_mock() =>
        {
            warn!(
                %source,
                kind = %error.kind(),
                message = error.message(),
                "serving fallback data"
            );
            Ok(Fetched {
                data: fallback(),
                source,
                cached: false,
                notice: Some(DataNotice::Fallback {
                    kind: error.kind(),
                    message: error.message().to_owned(),
                }),
            })
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, Outcome};

    #[test]
    fn fallback_carries_the_error_kind() {
        let config = ServiceConfig::new();
        let fetched = settle::<u32>(
            &config,
            ProviderId::Comtrade,
            Err(classify(Outcome::status(503, "Service Unavailable"))),
            || 7,
        )
        .expect("fallback enabled by default");

        assert_eq!(fetched.data, 7);
        assert!(fetched.is_degraded());
        let notice = fetched.notice.expect("notice present");
        assert_eq!(notice.label(), "Fallback Data");
        assert!(matches!(
            notice,
            DataNotice::Fallback {
                kind: ErrorKind::ServerFault,
                ..
            }
        ));
    }

    #[test]
    fn disabled_fallback_returns_the_error() {
        let config = ServiceConfig::new();
        config.set_fallback_to_mock(false);

        let error = settle::<u32>(
            &config,
            ProviderId::Comtrade,
            Err(classify(Outcome::status(404, ""))),
            || 7,
        )
        .expect_err("fallback disabled");
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn configuration_faults_are_never_masked() {
        let config = ServiceConfig::new();
        let error = settle::<u32>(
            &config,
            ProviderId::Comtrade,
            Err(classify(Outcome::configuration("bad input"))),
            || 7,
        )
        .expect_err("caller mistake propagates");
        assert_eq!(error.kind(), ErrorKind::ConfigurationFault);
    }

    #[test]
    fn demo_notice_serializes_with_mode_tag() {
        let fetched = Fetched::demo(1_u8, ProviderId::Ifsc);
        let json = serde_json::to_value(&fetched).expect("serializable");
        assert_eq!(json["notice"]["mode"], "demo");
        assert_eq!(fetched.notice.map(|n| n.label()), Some("Demo mode"));
    }
}
