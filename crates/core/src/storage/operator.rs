//! Backend over any OpenDAL operator.
//!
//! Containers are top-level directories holding a `.container` marker, so
//! an empty container still exists. Used for the local filesystem during
//! development and the in-memory service in tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use opendal::{Operator, services};
use tracing::debug;

use super::backend::{Connector, Container, ObjectStore, Session};
use super::error::{StorageError, StorageResult};
use super::types::{Credentials, StoredObject, UrlType};

/// Marker object that makes a directory a container.
pub const CONTAINER_MARKER: &str = ".container";

/// Connector wrapping an OpenDAL operator.
#[derive(Clone)]
pub struct OperatorConnector {
    operator: Operator,
    public_url: Option<String>,
}

impl OperatorConnector {
    /// Wrap an operator; public URLs are built from `public_url`.
    #[must_use]
    pub fn new(operator: Operator, public_url: Option<String>) -> Self {
        Self {
            operator,
            public_url: public_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Connector over a local directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be built.
    pub fn local_fs(root: &Path, public_url: Option<String>) -> StorageResult<Self> {
        let builder = services::Fs::default().root(
            root.to_str()
                .ok_or_else(|| StorageError::configuration("invalid path"))?,
        );
        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();
        Ok(Self::new(operator, public_url))
    }

    /// Connector over a fresh in-memory operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be built.
    pub fn memory(public_url: Option<String>) -> StorageResult<Self> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();
        Ok(Self::new(operator, public_url))
    }

    /// Underlying operator.
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

#[async_trait]
impl Connector for OperatorConnector {
    fn name(&self) -> &'static str {
        "opendal"
    }

    async fn authenticate(&self, credentials: &Credentials) -> StorageResult<Arc<dyn Session>> {
        debug!(
            scheme = %self.operator.info().scheme(),
            username = %credentials.username,
            "opened operator session"
        );
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Session for OperatorConnector {
    async fn object_store(
        &self,
        service_name: &str,
        region: &str,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        debug!(service = service_name, region, "operator object store ignores service scoping");
        Ok(Arc::new(self.clone()))
    }
}

impl OperatorConnector {
    fn container_handle(&self, name: &str) -> Arc<dyn Container> {
        Arc::new(OperatorContainer {
            operator: self.operator.clone(),
            name: name.to_string(),
            public_url: self.public_url.clone(),
        })
    }
}

fn validate_container_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.contains('/') {
        return Err(StorageError::configuration(format!(
            "invalid container name '{name}'"
        )));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for OperatorConnector {
    async fn container(&self, name: &str) -> StorageResult<Option<Arc<dyn Container>>> {
        validate_container_name(name)?;
        let marker = format!("{name}/{CONTAINER_MARKER}");
        if self.operator.exists(&marker).await? {
            Ok(Some(self.container_handle(name)))
        } else {
            Ok(None)
        }
    }

    async fn create_container(&self, name: &str) -> StorageResult<Arc<dyn Container>> {
        validate_container_name(name)?;
        let marker = format!("{name}/{CONTAINER_MARKER}");
        self.operator.write(&marker, Vec::<u8>::new()).await?;
        Ok(self.container_handle(name))
    }
}

/// Container stored under a directory of an operator.
struct OperatorContainer {
    operator: Operator,
    name: String,
    public_url: Option<String>,
}

/// Whether OpenDAL stores `name` under exactly that key.
///
/// OpenDAL normalizes paths, so a leading `/`, empty segments and `.`/`..`
/// segments would be stored under a different name than the one listed.
fn is_canonical_name(name: &str) -> bool {
    name != CONTAINER_MARKER
        && name
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

impl OperatorContainer {
    fn path(&self, name: &str) -> StorageResult<String> {
        if !is_canonical_name(name) {
            return Err(StorageError::InvalidKey(name.to_string()));
        }
        Ok(format!("{}/{name}", self.name))
    }

    /// Deepest directory that holds every name starting with `prefix`.
    fn list_root(&self, prefix: Option<&str>) -> String {
        let dir = prefix
            .and_then(|p| p.rfind('/').map(|idx| &p[..=idx]))
            .filter(|dir| is_canonical_name(dir.trim_end_matches('/')));
        match dir {
            Some(dir) => format!("{}/{dir}", self.name),
            None => format!("{}/", self.name),
        }
    }
}

#[async_trait]
impl Container for OperatorContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<StoredObject>> {
        let container_root = format!("{}/", self.name);
        let root = self.list_root(prefix);
        let entries = match self.operator.list_with(&root).recursive(true).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == opendal::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let mut objects: Vec<StoredObject> = entries
            .into_iter()
            .filter_map(|entry| {
                let name = entry.path().strip_prefix(&container_root)?.to_string();
                if name.is_empty() || name.ends_with('/') || name == CONTAINER_MARKER {
                    return None;
                }
                let metadata = entry.metadata();
                Some(StoredObject {
                    size: metadata.content_length(),
                    content_type: metadata.content_type().map(str::to_string),
                    etag: metadata.etag().map(str::to_string),
                    last_modified: None,
                    name,
                })
            })
            .filter(|object| prefix.is_none_or(|p| object.name.starts_with(p)))
            .filter(|object| marker.is_none_or(|m| object.name.as_str() > m))
            .collect();

        objects.sort_by(|a, b| a.name.cmp(&b.name));
        objects.truncate(limit);
        Ok(objects)
    }

    async fn stat(&self, name: &str) -> StorageResult<Option<StoredObject>> {
        let path = self.path(name)?;
        match self.operator.stat(&path).await {
            Ok(metadata) if metadata.is_dir() => Ok(None),
            Ok(metadata) => Ok(Some(StoredObject {
                name: name.to_string(),
                size: metadata.content_length(),
                content_type: metadata.content_type().map(str::to_string),
                etag: metadata.etag().map(str::to_string),
                last_modified: None,
            })),
            Err(err) if err.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(
        &self,
        name: &str,
        content_type: &str,
        body: Bytes,
    ) -> StorageResult<StoredObject> {
        let path = self.path(name)?;
        let size = body.len() as u64;

        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            self.operator
                .write_with(&path, body)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(&path, body).await?;
        }

        Ok(StoredObject::new(name, size).with_content_type(content_type))
    }

    async fn delete(&self, name: &str) -> StorageResult<bool> {
        let path = self.path(name)?;
        self.operator.delete(&path).await?;
        Ok(true)
    }

    async fn public_url(&self, name: &str, url_type: Option<UrlType>) -> StorageResult<String> {
        let base = self.public_url.as_deref().ok_or_else(|| {
            StorageError::unsupported("operator backend has no public URL configured")
        })?;
        if let Some(url_type) = url_type {
            debug!(%url_type, "operator backend serves a single URL variant");
        }
        Ok(format!("{base}/{}/{name}", self.name))
    }
}
