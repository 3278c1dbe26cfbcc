//! Object, payload and credential types shared by the repository and backends.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::{StorageError, StorageResult};

/// Account credentials presented to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account identity.
    pub username: String,
    /// API key.
    pub api_key: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// An object stored in a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Object name, unique within its container.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type, when the backend tracks one.
    pub content_type: Option<String>,
    /// Entity tag, usually the MD5 of the content.
    pub etag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredObject {
    /// Create an object descriptor with only a name and size.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: None,
            etag: None,
            last_modified: None,
        }
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Where the bytes of an upload come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSource {
    /// Read from a local file at upload time.
    File(PathBuf),
    /// Uploaded as given.
    Bytes(Bytes),
}

/// Content to store under a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPayload {
    /// Content type sent with the object.
    pub content_type: String,
    /// Content source.
    pub source: ObjectSource,
}

impl ObjectPayload {
    /// Payload read from a local file.
    #[must_use]
    pub fn from_file(content_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            content_type: content_type.into(),
            source: ObjectSource::File(path.into()),
        }
    }

    /// Payload held in memory.
    #[must_use]
    pub fn from_bytes(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            source: ObjectSource::Bytes(data.into()),
        }
    }

    /// Build a payload from optional parts, requiring exactly one source.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` when both or neither source is given, or the
    /// content type is empty.
    pub fn from_parts(
        content_type: impl Into<String>,
        path: Option<PathBuf>,
        data: Option<Bytes>,
    ) -> StorageResult<Self> {
        let content_type = content_type.into();
        if content_type.trim().is_empty() {
            return Err(StorageError::invalid_payload("content type is empty"));
        }
        let source = match (path, data) {
            (Some(path), None) => ObjectSource::File(path),
            (None, Some(data)) => ObjectSource::Bytes(data),
            (Some(_), Some(_)) => {
                return Err(StorageError::invalid_payload(
                    "both a file path and inline data were given",
                ));
            }
            (None, None) => {
                return Err(StorageError::invalid_payload(
                    "neither a file path nor inline data was given",
                ));
            }
        };
        Ok(Self {
            content_type,
            source,
        })
    }

    /// Load the payload content.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file source cannot be read.
    pub async fn into_body(self) -> StorageResult<Bytes> {
        match self.source {
            ObjectSource::Bytes(data) => Ok(data),
            ObjectSource::File(path) => Ok(Bytes::from(tokio::fs::read(&path).await?)),
        }
    }
}

/// Delivery variant of a public URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlType {
    /// HTTPS delivery.
    Ssl,
    /// Streaming delivery.
    Streaming,
    /// iOS streaming delivery.
    Ios,
}

impl UrlType {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ssl => "ssl",
            Self::Streaming => "streaming",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ssl" => Ok(Self::Ssl),
            "streaming" => Ok(Self::Streaming),
            "ios" => Ok(Self::Ios),
            other => Err(StorageError::configuration(format!(
                "unknown URL type '{other}', expected ssl, streaming or ios"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = Credentials::new("mark", "super-secret");
        let debug = format!("{creds:?}");
        assert!(debug.contains("mark"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_payload_from_parts() {
        let payload =
            ObjectPayload::from_parts("image/png", None, Some(Bytes::from_static(b"png")))
                .expect("inline payload");
        assert_eq!(payload.source, ObjectSource::Bytes(Bytes::from_static(b"png")));

        let payload = ObjectPayload::from_parts("image/png", Some(PathBuf::from("a.png")), None)
            .expect("file payload");
        assert_eq!(payload.source, ObjectSource::File(PathBuf::from("a.png")));
    }

    #[test]
    fn test_payload_from_parts_requires_one_source() {
        let err = ObjectPayload::from_parts("image/png", None, None).unwrap_err();
        assert!(matches!(err, StorageError::InvalidPayload(_)));

        let err = ObjectPayload::from_parts(
            "image/png",
            Some(PathBuf::from("a.png")),
            Some(Bytes::from_static(b"png")),
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPayload(_)));

        let err =
            ObjectPayload::from_parts("", None, Some(Bytes::from_static(b"png"))).unwrap_err();
        assert!(matches!(err, StorageError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_payload_body_from_file() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"hello").expect("should write file");

        let body = ObjectPayload::from_file("text/plain", &path)
            .into_body()
            .await
            .expect("should read file");
        assert_eq!(body, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_payload_body_missing_file() {
        let err = ObjectPayload::from_file("text/plain", "/nonexistent/cloudstash/file.txt")
            .into_body()
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn test_url_type_parse() {
        assert_eq!("ssl".parse::<UrlType>().expect("ssl"), UrlType::Ssl);
        assert_eq!("SSL".parse::<UrlType>().expect("SSL"), UrlType::Ssl);
        assert_eq!(
            "streaming".parse::<UrlType>().expect("streaming"),
            UrlType::Streaming
        );
        assert_eq!("ios".parse::<UrlType>().expect("ios"), UrlType::Ios);
        assert!("ftp".parse::<UrlType>().is_err());
        assert_eq!(UrlType::Streaming.to_string(), "streaming");
    }
}
