//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// The browser profile has no logged-in session
    #[error("Not logged in: {message}")]
    NotLoggedIn {
        /// Error message
        message: String,
    },

    /// The command needs a cargo feature this build lacks
    #[error("Feature '{feature}' is not enabled. Rebuild with --features {feature}")]
    FeatureDisabled {
        /// Feature name
        feature: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Alumnus library error
    #[error("Alumnus error: {0}")]
    Alumnus(#[from] alumnus::AlumnusError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not-logged-in error
    #[must_use]
    pub fn not_logged_in(message: impl Into<String>) -> Self {
        Self::NotLoggedIn {
            message: message.into(),
        }
    }

    /// Create a feature-disabled error
    #[must_use]
    pub fn feature_disabled(feature: impl Into<String>) -> Self {
        Self::FeatureDisabled {
            feature: feature.into(),
        }
    }
}
