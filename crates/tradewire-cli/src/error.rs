use thiserror::Error;
use tradewire_core::{ClassifiedError, ConfigError, ErrorKind};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("command error: {0}")]
    Command(String),

    #[error("upstream error: {0}")]
    Upstream(ClassifiedError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ClassifiedError> for CliError {
    fn from(error: ClassifiedError) -> Self {
        // Rejected input is the caller's mistake, not the provider's.
        if error.kind() == ErrorKind::ConfigurationFault {
            Self::Command(error.message().to_owned())
        } else {
            Self::Upstream(error)
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Command(_) => 2,
            Self::Upstream(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
