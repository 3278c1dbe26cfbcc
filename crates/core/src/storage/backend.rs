//! Backend seams of the lazy resource chain.
//!
//! A [`Connector`] authenticates and yields a [`Session`], the session
//! yields the [`ObjectStore`] for a service and region, and the store yields
//! named [`Container`]s. The repository builds each link once and caches it;
//! none of these traits retry on their own.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::StorageResult;
use super::types::{Credentials, StoredObject, UrlType};

/// Credential client: turns credentials into an authenticated session.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Authenticate against the backend.
    async fn authenticate(&self, credentials: &Credentials) -> StorageResult<Arc<dyn Session>>;
}

/// Authenticated context.
#[async_trait]
pub trait Session: Send + Sync {
    /// Object-store service named `service_name` in `region`.
    async fn object_store(
        &self,
        service_name: &str,
        region: &str,
    ) -> StorageResult<Arc<dyn ObjectStore>>;
}

/// Object-store service scoped to a region.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up a container; `Ok(None)` when it does not exist.
    async fn container(&self, name: &str) -> StorageResult<Option<Arc<dyn Container>>>;

    /// Create a container.
    async fn create_container(&self, name: &str) -> StorageResult<Arc<dyn Container>>;
}

/// A named collection of objects.
#[async_trait]
pub trait Container: Send + Sync {
    /// Container name.
    fn name(&self) -> &str;

    /// One page of objects whose names start with `prefix`, sorted by name,
    /// strictly after `marker`, at most `limit` long.
    async fn list_page(
        &self,
        prefix: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<StoredObject>>;

    /// Object metadata; `Ok(None)` when absent.
    async fn stat(&self, name: &str) -> StorageResult<Option<StoredObject>>;

    /// Create or overwrite an object.
    async fn put(&self, name: &str, content_type: &str, body: Bytes)
    -> StorageResult<StoredObject>;

    /// Delete an object; `Ok(false)` when the backend reports it absent.
    async fn delete(&self, name: &str) -> StorageResult<bool>;

    /// Public URL of an object as the backend reports it.
    async fn public_url(&self, name: &str, url_type: Option<UrlType>) -> StorageResult<String>;
}
