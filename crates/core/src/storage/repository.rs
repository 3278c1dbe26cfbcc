//! Object repository: the public facade over a storage backend.

use std::sync::Arc;

use cloudstash_shared::{BackendSettings, StorageSettings, TrustBundleLocator};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::backend::{Connector, Container, ObjectStore, Session};
use super::error::{StorageError, StorageResult};
use super::operator::OperatorConnector;
use super::retry::RetryPolicy;
use super::swift::SwiftConnector;
use super::types::{Credentials, ObjectPayload, StoredObject, UrlType};
use super::url::{container_base_url, rewrite_origin};

/// Retry-aware facade for one container.
///
/// The session, object store and container handles are built lazily, at
/// most once each, and reused for the life of the repository. A failed
/// construction is returned to the caller unchanged and leaves the slot
/// empty, so the next call tries again.
pub struct ObjectRepository {
    settings: StorageSettings,
    credentials: Credentials,
    connector: Arc<dyn Connector>,
    retry: RetryPolicy,
    session: OnceCell<Arc<dyn Session>>,
    store: OnceCell<Arc<dyn ObjectStore>>,
    container: OnceCell<Arc<dyn Container>>,
}

impl ObjectRepository {
    /// Create a repository that reaches the backend through `connector`.
    #[must_use]
    pub fn new(settings: StorageSettings, connector: Arc<dyn Connector>) -> Self {
        let credentials = Credentials::new(settings.username.clone(), settings.api_key.clone());
        let retry = RetryPolicy::from_settings(&settings);
        Self {
            settings,
            credentials,
            connector,
            retry,
            session: OnceCell::new(),
            store: OnceCell::new(),
            container: OnceCell::new(),
        }
    }

    /// Create a repository for the backend selected in `settings`.
    ///
    /// Nothing is sent to the backend until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are incomplete, the trust bundle
    /// cannot be found, or the backend client cannot be built.
    pub fn from_settings(
        settings: StorageSettings,
        locator: &TrustBundleLocator,
    ) -> StorageResult<Self> {
        settings.validate()?;

        let connector: Arc<dyn Connector> = match &settings.backend {
            BackendSettings::Swift => {
                let trust_bundle = settings
                    .cacert
                    .as_deref()
                    .map(|reference| locator.resolve(reference))
                    .transpose()?;
                Arc::new(SwiftConnector::new(
                    settings.endpoint.clone(),
                    trust_bundle.as_deref(),
                )?)
            }
            BackendSettings::LocalFs { root, public_url } => {
                Arc::new(OperatorConnector::local_fs(root, public_url.clone())?)
            }
        };

        info!(
            backend = settings.backend.name(),
            container = %settings.container,
            "storage repository configured"
        );
        Ok(Self::new(settings, connector))
    }

    /// Override the URL resolution retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Settings this repository was built with.
    #[must_use]
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Authenticated session, created on first use.
    pub async fn session(&self) -> StorageResult<&dyn Session> {
        let session = self
            .session
            .get_or_try_init(|| async {
                debug!(backend = self.connector.name(), "authenticating");
                self.connector.authenticate(&self.credentials).await
            })
            .await?;
        Ok(session.as_ref())
    }

    /// Object-store service, created on first use.
    pub async fn object_store(&self) -> StorageResult<&dyn ObjectStore> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let session = self.session().await?;
                debug!(
                    service = %self.settings.service_name,
                    region = %self.settings.region,
                    "opening object store"
                );
                session
                    .object_store(&self.settings.service_name, &self.settings.region)
                    .await
            })
            .await?;
        Ok(store.as_ref())
    }

    /// Configured container, looked up or created on first use.
    pub async fn container(&self) -> StorageResult<&dyn Container> {
        let container = self
            .container
            .get_or_try_init(|| self.open_container())
            .await?;
        Ok(container.as_ref())
    }

    async fn open_container(&self) -> StorageResult<Arc<dyn Container>> {
        let store = self.object_store().await?;
        let name = self.settings.container.as_str();

        if let Some(container) = store.container(name).await? {
            debug!(container = name, "opened container");
            return Ok(container);
        }

        info!(container = name, "container not found, creating it");
        match store.create_container(name).await {
            Ok(container) => Ok(container),
            Err(err) if err.is_already_exists() => {
                warn!(container = name, "container created concurrently, reopening");
                store.container(name).await?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Every object whose name starts with `prefix`, or the whole container.
    ///
    /// The backend listing is drained page by page before returning.
    pub async fn list_objects(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
        let container = self.container().await?;
        let prefix = prefix.filter(|p| !p.is_empty());
        let limit = self.settings.list_page_size.max(1);

        // Backends may cap a page below `limit`, so only an empty page (or a
        // marker that stops advancing) ends the listing.
        let mut objects = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = container
                .list_page(prefix, marker.as_deref(), limit)
                .await?;
            let Some(last) = page.last().map(|object| object.name.clone()) else {
                break;
            };
            if marker.as_deref().is_some_and(|m| last.as_str() <= m) {
                warn!(container = container.name(), marker = %last, "listing marker did not advance");
                break;
            }
            marker = Some(last);
            objects.extend(page);
        }

        debug!(
            container = container.name(),
            prefix = prefix.unwrap_or(""),
            count = objects.len(),
            "listed objects"
        );
        Ok(objects)
    }

    /// Whether an object named exactly `name` exists.
    ///
    /// Other objects may share `name` as a prefix, so the listing is scanned
    /// for an exact match.
    pub async fn has_object(&self, name: &str) -> StorageResult<bool> {
        if name.is_empty() {
            return Ok(false);
        }
        let candidates = self.list_objects(Some(name)).await?;
        Ok(candidates.iter().any(|object| object.name == name))
    }

    /// Metadata of the object named `name`; `Ok(None)` when absent.
    ///
    /// The empty name never names an object and is answered without a
    /// backend call.
    pub async fn get_object(&self, name: &str) -> StorageResult<Option<StoredObject>> {
        if name.is_empty() {
            return Ok(None);
        }
        let container = self.container().await?;
        match container.stat(name).await {
            Ok(object) => Ok(object),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Store `payload` under `name`, replacing any existing object.
    ///
    /// A file payload is read before the backend is contacted.
    pub async fn save_object(
        &self,
        name: &str,
        payload: ObjectPayload,
    ) -> StorageResult<StoredObject> {
        if name.is_empty() {
            return Err(StorageError::InvalidKey(name.to_string()));
        }
        let content_type = payload.content_type.clone();
        let body = payload.into_body().await?;

        let container = self.container().await?;
        let object = container.put(name, &content_type, body).await?;
        info!(
            container = container.name(),
            name,
            size = object.size,
            content_type = %content_type,
            "saved object"
        );
        Ok(object)
    }

    /// Delete the object named `name`.
    ///
    /// Returns `Ok(false)` when there is no such object, `Ok(true)` when the
    /// backend confirmed the delete.
    pub async fn delete_object(&self, name: &str) -> StorageResult<bool> {
        if self.get_object(name).await?.is_none() {
            debug!(name, "delete skipped, object not found");
            return Ok(false);
        }
        let container = self.container().await?;
        let deleted = container.delete(name).await?;
        info!(container = container.name(), name, deleted, "deleted object");
        Ok(deleted)
    }

    /// Purge an object from the CDN cache.
    ///
    /// No purge request is sent; this always reports success.
    pub fn purge_object(&self, name: &str) -> bool {
        debug!(container = %self.settings.container, name, "CDN purge is not performed");
        true
    }

    /// Public URL of the object named `name`; `Ok(None)` when absent.
    ///
    /// URL generation is retried on transient failures per the retry policy.
    /// When both the storage origin and the CDN origin are configured the
    /// storage origin in the URL is replaced by the CDN origin.
    pub async fn get_url(
        &self,
        name: &str,
        url_type: Option<UrlType>,
    ) -> StorageResult<Option<String>> {
        if self.get_object(name).await?.is_none() {
            return Ok(None);
        }

        let container = self.container().await?;
        let raw = self
            .retry
            .run("public_url", move || container.public_url(name, url_type))
            .await?;

        let url = rewrite_origin(
            &raw,
            self.settings.container_url.as_deref(),
            self.settings.cdn_url.as_deref(),
        );
        debug!(name, raw = %raw, url = %url, "resolved public url");
        Ok(Some(url))
    }

    /// Base URL of the container.
    ///
    /// `is_secure` tells whether the inbound request being served arrived
    /// over TLS; the URL uses the same scheme.
    pub fn container_url(&self, is_secure: bool) -> StorageResult<String> {
        container_base_url(
            self.settings.cdn_url.as_deref(),
            self.settings.container_url.as_deref(),
            is_secure,
        )
    }
}
