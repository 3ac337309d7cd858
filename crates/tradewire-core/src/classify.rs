//! Maps transport and HTTP outcomes onto [`ErrorKind`].
//!
//! | Outcome | Kind |
//! |---------|------|
//! | HTTP 401 / 403 | `Unauthorized` |
//! | HTTP 404 | `NotFound` |
//! | HTTP 429 | `RateLimited` |
//! | HTTP 5xx | `ServerFault` |
//! | any other status, 408 included | `InvalidResponse` |
//! | transport timeout | `Timeout` |
//! | connection / DNS failure | `Network` |
//! | undecodable body | `InvalidResponse` |
//! | empty payload | `NoData` |
//! | cache failure | `CacheFault` |
//! | bad configuration or descriptor | `ConfigurationFault` |
//!
//! This is the only place a [`ClassifiedError`] is built.

use std::time::Duration;

use crate::error::{ClassifiedError, ConfigError, ErrorKind};
use crate::http_client::TransportError;

/// Everything that can go wrong on the way to a decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Status { status: u16, reason: String },
    Transport(TransportError),
    TimedOut { after: Duration },
    Undecodable { detail: String },
    Empty { detail: String },
    Cache { detail: String },
    Configuration { detail: String },
}

impl Outcome {
    pub fn status(status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
        }
    }

    pub fn undecodable(detail: impl Into<String>) -> Self {
        Self::Undecodable {
            detail: detail.into(),
        }
    }

    pub fn empty(detail: impl Into<String>) -> Self {
        Self::Empty {
            detail: detail.into(),
        }
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::Configuration {
            detail: detail.into(),
        }
    }
}

/// Kind assigned to a non-success HTTP status.
pub const fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Unauthorized,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::ServerFault,
        _ => ErrorKind::InvalidResponse,
    }
}

pub fn classify(outcome: Outcome) -> ClassifiedError {
    match outcome {
        Outcome::Status { status, reason } => {
            let kind = kind_for_status(status);
            let message = if reason.trim().is_empty() {
                format!("upstream returned status {status}")
            } else {
                format!("upstream returned status {status}: {}", reason.trim())
            };
            ClassifiedError::new(kind, message, Some(status), None)
        }
        Outcome::Transport(error) => {
            let kind = match error {
                TransportError::Timeout(_) => ErrorKind::Timeout,
                TransportError::Connect(_) | TransportError::Dns(_) | TransportError::Other(_) => {
                    ErrorKind::Network
                }
            };
            ClassifiedError::new(kind, error.to_string(), None, Some(error.detail().to_owned()))
        }
        Outcome::TimedOut { after } => ClassifiedError::new(
            ErrorKind::Timeout,
            format!("request exceeded {}ms", after.as_millis()),
            None,
            None,
        ),
        Outcome::Undecodable { detail } => ClassifiedError::new(
            ErrorKind::InvalidResponse,
            "response body could not be decoded",
            None,
            Some(detail),
        ),
        Outcome::Empty { detail } => ClassifiedError::new(ErrorKind::NoData, detail, None, None),
        Outcome::Cache { detail } => ClassifiedError::new(
            ErrorKind::CacheFault,
            "cached payload could not be used",
            None,
            Some(detail),
        ),
        Outcome::Configuration { detail } => {
            ClassifiedError::new(ErrorKind::ConfigurationFault, detail, None, None)
        }
    }
}

impl From<ConfigError> for ClassifiedError {
    fn from(error: ConfigError) -> Self {
        classify(Outcome::configuration(error.to_string()))
    }
}
