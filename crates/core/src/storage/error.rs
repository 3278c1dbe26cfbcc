//! Storage error types.

use cloudstash_shared::ConfigurationError;
use thiserror::Error;

/// Result type alias using `StorageError`.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage operation errors.
///
/// "Object not found" is not an error at the repository surface; it is
/// reported as `Ok(None)` or `Ok(false)`. `NotFound` only travels between a
/// backend and the repository.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// The backend rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Object or container not found in storage.
    #[error("not found: {0}")]
    NotFound(String),

    /// Container or object already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The backend answered with an unexpected HTTP status.
    #[error("backend returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other backend failure.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// The backend cannot perform the requested operation.
    #[error("operation not supported by storage backend: {0}")]
    Unsupported(String),

    /// Invalid object name.
    #[error("invalid object name: {0}")]
    InvalidKey(String),

    /// Payload has no source or more than one.
    #[error("invalid object payload: {0}")]
    InvalidPayload(String),

    /// Reading a payload from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL resolution kept failing transiently.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total attempts made, the first one included.
        attempts: u32,
        /// Error returned by the last attempt.
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an unsupported operation error.
    #[must_use]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create an invalid payload error.
    #[must_use]
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, 408, 429 and 5xx responses are transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            _ => false,
        }
    }

    /// Whether this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Http { status: 404, .. })
    }

    /// Whether this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_) | Self::Http { status: 409, .. })
    }

    /// Number of attempts behind this error; 1 unless retries ran out.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RetriesExhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

impl From<ConfigurationError> for StorageError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Configuration(err.to_string())
        } else if err.is_decode() {
            Self::Operation(format!("invalid response body: {err}"))
        } else if let Some(status) = err.status() {
            Self::http(status.as_u16(), err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            opendal::ErrorKind::AlreadyExists => Self::AlreadyExists(err.to_string()),
            opendal::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ if err.is_temporary() => Self::Transport(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::transport(StorageError::Transport("connection reset".into()), true)]
    #[case::server_error(StorageError::http(503, "unavailable"), true)]
    #[case::bad_gateway(StorageError::http(502, "bad gateway"), true)]
    #[case::timeout(StorageError::http(408, "timeout"), true)]
    #[case::throttled(StorageError::http(429, "slow down"), true)]
    #[case::not_found(StorageError::http(404, "missing"), false)]
    #[case::forbidden(StorageError::http(403, "forbidden"), false)]
    #[case::operation(StorageError::operation("rejected"), false)]
    #[case::configuration(StorageError::configuration("no url"), false)]
    fn test_is_transient(#[case] err: StorageError, #[case] expected: bool) {
        assert_eq!(err.is_transient(), expected);
    }

    #[test]
    fn test_retries_exhausted_display() {
        let err = StorageError::RetriesExhausted {
            attempts: 4,
            source: Box::new(StorageError::http(503, "unavailable")),
        };
        assert_eq!(err.attempts(), 4);
        assert_eq!(
            err.to_string(),
            "gave up after 4 attempts: backend returned HTTP 503: unavailable"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_not_found_and_conflict_helpers() {
        assert!(StorageError::not_found("logo.png").is_not_found());
        assert!(StorageError::http(404, "").is_not_found());
        assert!(!StorageError::http(500, "").is_not_found());
        assert!(StorageError::AlreadyExists("assets".into()).is_already_exists());
        assert!(StorageError::http(409, "").is_already_exists());
        assert_eq!(StorageError::operation("x").attempts(), 1);
    }

    #[test]
    fn test_from_configuration_error() {
        let err: StorageError = ConfigurationError::missing("storage.cdn_url").into();
        assert!(matches!(err, StorageError::Configuration(_)));
        assert_eq!(
            err.to_string(),
            "storage configuration error: missing configuration value: storage.cdn_url"
        );
    }

    #[test]
    fn test_from_opendal_error() {
        let err: StorageError =
            opendal::Error::new(opendal::ErrorKind::NotFound, "no such object").into();
        assert!(err.is_not_found());

        let err: StorageError =
            opendal::Error::new(opendal::ErrorKind::Unexpected, "flaky").set_temporary().into();
        assert!(err.is_transient());

        let err: StorageError =
            opendal::Error::new(opendal::ErrorKind::Unsupported, "presign").into();
        assert!(matches!(err, StorageError::Unsupported(_)));
    }
}
