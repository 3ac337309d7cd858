use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Third-party providers reachable through the request executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Comtrade,
    WorldBank,
    OpenCorporates,
    IndiaPost,
    Ifsc,
    ExchangeRate,
}

impl ProviderId {
    pub const ALL: [Self; 6] = [
        Self::Comtrade,
        Self::WorldBank,
        Self::OpenCorporates,
        Self::IndiaPost,
        Self::Ifsc,
        Self::ExchangeRate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comtrade => "comtrade",
            Self::WorldBank => "world_bank",
            Self::OpenCorporates => "open_corporates",
            Self::IndiaPost => "india_post",
            Self::Ifsc => "ifsc",
            Self::ExchangeRate => "exchange_rate",
        }
    }

    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Comtrade => "https://comtradeapi.un.org/data/v1",
            Self::WorldBank => "https://api.worldbank.org/v2",
            Self::OpenCorporates => "https://api.opencorporates.com/v0.4",
            Self::IndiaPost => "https://api.postalpincode.in",
            Self::Ifsc => "https://ifsc.razorpay.com",
            Self::ExchangeRate => "https://api.exchangerate-api.com/v4",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownProvider {
                value: value.trim().to_owned(),
            })
    }
}
