//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `ConfigurationError`.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required key has no value.
    #[error("missing configuration value: {0}")]
    Missing(String),

    /// A key has a value that cannot be used.
    #[error("invalid configuration value for {key}: {message}")]
    Invalid {
        /// Offending key.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// The referenced trust bundle does not exist on disk.
    #[error("trust bundle not found: {}", .0.display())]
    TrustBundleNotFound(PathBuf),

    /// Loading the layered configuration failed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigurationError {
    /// Create a missing value error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing(key.into())
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}
