use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure categories surfaced to provider wrappers and the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    RateLimited,
    Unauthorized,
    NotFound,
    ServerFault,
    InvalidResponse,
    CacheFault,
    ConfigurationFault,
    NoData,
}

impl ErrorKind {
    pub const ALL: [Self; 10] = [
        Self::Network,
        Self::Timeout,
        Self::RateLimited,
        Self::Unauthorized,
        Self::NotFound,
        Self::ServerFault,
        Self::InvalidResponse,
        Self::CacheFault,
        Self::ConfigurationFault,
        Self::NoData,
    ];

    /// Retry eligibility is a property of the kind alone.
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::ServerFault
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::ServerFault => "server_fault",
            Self::InvalidResponse => "invalid_response",
            Self::CacheFault => "cache_fault",
            Self::ConfigurationFault => "configuration_fault",
            Self::NoData => "no_data",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure produced by [`crate::classify::classify`].
///
/// Fields are private so that `retryable` can never disagree with `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
}

impl ClassifiedError {
    pub(crate) fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        status: Option<u16>,
        cause: Option<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            status,
            cause,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    /// HTTP status that produced this error, when one was received.
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

/// Invalid configuration values and identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config key '{key}' expects a boolean, got '{value}'")]
    InvalidBool { key: String, value: String },

    #[error("config key '{key}' expects a non-negative number, got '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("unknown provider '{value}'")]
    UnknownProvider { value: String },

    #[error("failed to read env file '{path}': {reason}")]
    EnvFile { path: String, reason: String },
}
