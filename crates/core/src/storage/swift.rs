//! OpenStack Swift / Rackspace Cloud Files backend.
//!
//! Authentication uses the Rackspace API key flavour of the identity v2
//! token request; the token and service catalog it returns drive every
//! later request.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, LAST_MODIFIED};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::backend::{Connector, Container, ObjectStore, Session};
use super::error::{StorageError, StorageResult};
use super::types::{Credentials, StoredObject, UrlType};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const CDN_ENABLED_HEADER: &str = "X-Cdn-Enabled";

/// Connector for Swift-compatible object storage.
#[derive(Debug, Clone)]
pub struct SwiftConnector {
    endpoint: String,
    client: Client,
}

impl SwiftConnector {
    /// Create a connector for an identity endpoint.
    ///
    /// When `trust_bundle` is given, every certificate in that PEM file is
    /// trusted in addition to the system roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be read or parsed, or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: impl Into<String>, trust_bundle: Option<&Path>) -> StorageResult<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("cloudstash/", env!("CARGO_PKG_VERSION")));

        if let Some(path) = trust_bundle {
            let pem = std::fs::read(path)?;
            let certificates = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                StorageError::configuration(format!(
                    "invalid trust bundle {}: {e}",
                    path.display()
                ))
            })?;
            debug!(path = %path.display(), count = certificates.len(), "loaded trust bundle");
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder.build()?;
        Ok(Self::with_client(endpoint, client))
    }

    /// Create a connector that sends requests through `client`.
    #[must_use]
    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    fn tokens_url(&self) -> StorageResult<Url> {
        let base = Url::parse(&self.endpoint).map_err(|e| {
            StorageError::configuration(format!("invalid endpoint '{}': {e}", self.endpoint))
        })?;
        join_segments(&base, ["tokens"])
    }
}

#[async_trait]
impl Connector for SwiftConnector {
    fn name(&self) -> &'static str {
        "swift"
    }

    async fn authenticate(&self, credentials: &Credentials) -> StorageResult<Arc<dyn Session>> {
        let url = self.tokens_url()?;
        let body = json!({
            "auth": {
                "RAX-KSKEY:apiKeyCredentials": {
                    "username": credentials.username,
                    "apiKey": credentials.api_key,
                }
            }
        });

        let response = self.client.post(url).json(&body).send().await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(StorageError::Authentication(format!(
                "identity endpoint rejected credentials for '{}' ({})",
                credentials.username,
                response.status()
            )));
        }
        let response = ensure_success(response).await?;
        let auth: AuthResponse = response.json().await?;

        info!(
            username = %credentials.username,
            services = auth.access.service_catalog.len(),
            "authenticated storage session"
        );

        Ok(Arc::new(SwiftSession {
            client: self.client.clone(),
            token: auth.access.token.id,
            catalog: auth.access.service_catalog,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    name: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: String,
}

/// Authenticated Swift session.
struct SwiftSession {
    client: Client,
    token: String,
    catalog: Vec<CatalogEntry>,
}

impl SwiftSession {
    fn endpoint_for(&self, service_name: &str, region: &str) -> Option<&str> {
        self.catalog
            .iter()
            .find(|entry| entry.name == service_name)?
            .endpoints
            .iter()
            .find(|endpoint| {
                endpoint
                    .region
                    .as_deref()
                    .is_none_or(|r| r.eq_ignore_ascii_case(region))
            })
            .map(|endpoint| endpoint.public_url.as_str())
    }
}

#[async_trait]
impl Session for SwiftSession {
    async fn object_store(
        &self,
        service_name: &str,
        region: &str,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        let storage_url = self.endpoint_for(service_name, region).ok_or_else(|| {
            StorageError::configuration(format!(
                "service catalog has no '{service_name}' endpoint in region {region}"
            ))
        })?;
        let cdn_url = self.endpoint_for(&format!("{service_name}CDN"), region);

        debug!(
            service = service_name,
            region,
            storage_url,
            cdn_url = cdn_url.unwrap_or("-"),
            "resolved object store endpoints"
        );

        Ok(Arc::new(SwiftObjectStore {
            client: self.client.clone(),
            token: self.token.clone(),
            storage_url: parse_endpoint(storage_url)?,
            cdn_url: cdn_url.map(parse_endpoint).transpose()?,
        }))
    }
}

/// Swift object store in one region.
struct SwiftObjectStore {
    client: Client,
    token: String,
    storage_url: Url,
    cdn_url: Option<Url>,
}

impl SwiftObjectStore {
    fn container_handle(&self, name: &str) -> StorageResult<Arc<dyn Container>> {
        Ok(Arc::new(SwiftContainer {
            client: self.client.clone(),
            token: self.token.clone(),
            name: name.to_string(),
            url: join_segments(&self.storage_url, [name])?,
            cdn_url: self
                .cdn_url
                .as_ref()
                .map(|cdn| join_segments(cdn, [name]))
                .transpose()?,
        }))
    }
}

#[async_trait]
impl ObjectStore for SwiftObjectStore {
    async fn container(&self, name: &str) -> StorageResult<Option<Arc<dyn Container>>> {
        let url = join_segments(&self.storage_url, [name])?;
        let response = authorized(self.client.head(url), &self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        ensure_success(response).await?;
        self.container_handle(name).map(Some)
    }

    async fn create_container(&self, name: &str) -> StorageResult<Arc<dyn Container>> {
        let url = join_segments(&self.storage_url, [name])?;
        let response = authorized(self.client.put(url), &self.token)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;

        // 202 means the container was already there.
        let status = response.status();
        ensure_success(response).await?;
        info!(container = name, status = status.as_u16(), "created container");
        self.container_handle(name)
    }
}

/// Swift container.
struct SwiftContainer {
    client: Client,
    token: String,
    name: String,
    url: Url,
    cdn_url: Option<Url>,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    #[serde(default)]
    bytes: u64,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    last_modified: Option<String>,
}

impl From<ListedObject> for StoredObject {
    fn from(listed: ListedObject) -> Self {
        Self {
            name: listed.name,
            size: listed.bytes,
            content_type: listed.content_type,
            etag: listed.hash,
            last_modified: listed.last_modified.as_deref().and_then(parse_listing_time),
        }
    }
}

impl SwiftContainer {
    /// URL of an object; names that would address the container itself are
    /// rejected.
    fn object_url(&self, name: &str) -> StorageResult<Url> {
        if name.is_empty() || name.ends_with('/') {
            return Err(StorageError::InvalidKey(name.to_string()));
        }
        join_segments(&self.url, name.split('/'))
    }

    async fn cdn_uri(&self, url_type: Option<UrlType>) -> StorageResult<Option<String>> {
        let Some(cdn_url) = &self.cdn_url else {
            return Ok(None);
        };

        let response = authorized(self.client.head(cdn_url.clone()), &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let headers = response.headers();

        if header_str(headers, CDN_ENABLED_HEADER).is_some_and(|v| v.eq_ignore_ascii_case("false"))
        {
            return Ok(None);
        }

        let header = match url_type {
            None => "X-Cdn-Uri",
            Some(UrlType::Ssl) => "X-Cdn-Ssl-Uri",
            Some(UrlType::Streaming) => "X-Cdn-Streaming-Uri",
            Some(UrlType::Ios) => "X-Cdn-Ios-Uri",
        };
        match header_str(headers, header) {
            Some(uri) => Ok(Some(uri.to_string())),
            None if url_type.is_some() => Err(StorageError::unsupported(format!(
                "container '{}' has no {} CDN URI",
                self.name,
                url_type.map_or("default", UrlType::as_str)
            ))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Container for SwiftContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        marker: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<StoredObject>> {
        let limit = limit.to_string();
        let mut request = authorized(self.client.get(self.url.clone()), &self.token)
            .query(&[("format", "json"), ("limit", limit.as_str())]);
        if let Some(prefix) = prefix {
            request = request.query(&[("prefix", prefix)]);
        }
        if let Some(marker) = marker {
            request = request.query(&[("marker", marker)]);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::not_found(format!("container {}", self.name)));
        }
        let listed: Vec<ListedObject> = ensure_success(response).await?.json().await?;
        Ok(listed.into_iter().map(StoredObject::from).collect())
    }

    async fn stat(&self, name: &str) -> StorageResult<Option<StoredObject>> {
        let response = authorized(self.client.head(self.object_url(name)?), &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let headers = response.headers();

        Ok(Some(StoredObject {
            name: name.to_string(),
            size: header_str(headers, CONTENT_LENGTH.as_str())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            content_type: header_str(headers, CONTENT_TYPE.as_str()).map(str::to_string),
            etag: header_str(headers, ETAG.as_str()).map(|v| v.trim_matches('"').to_string()),
            last_modified: header_str(headers, LAST_MODIFIED.as_str()).and_then(parse_http_date),
        }))
    }

    async fn put(
        &self,
        name: &str,
        content_type: &str,
        body: Bytes,
    ) -> StorageResult<StoredObject> {
        let size = body.len() as u64;
        let response = authorized(self.client.put(self.object_url(name)?), &self.token)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let headers = response.headers();

        Ok(StoredObject {
            name: name.to_string(),
            size,
            content_type: Some(content_type.to_string()),
            etag: header_str(headers, ETAG.as_str()).map(|v| v.trim_matches('"').to_string()),
            last_modified: header_str(headers, LAST_MODIFIED.as_str()).and_then(parse_http_date),
        })
    }

    async fn delete(&self, name: &str) -> StorageResult<bool> {
        let response = authorized(self.client.delete(self.object_url(name)?), &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn public_url(&self, name: &str, url_type: Option<UrlType>) -> StorageResult<String> {
        match self.cdn_uri(url_type).await? {
            Some(base) => {
                let base = Url::parse(&base).map_err(|e| {
                    StorageError::operation(format!("backend returned invalid CDN URI '{base}': {e}"))
                })?;
                Ok(join_segments(&base, name.split('/'))?.to_string())
            }
            None => Ok(self.object_url(name)?.to_string()),
        }
    }
}

fn authorized(request: RequestBuilder, token: &str) -> RequestBuilder {
    request.header(AUTH_TOKEN_HEADER, token)
}

/// Turn a non-2xx response into an error carrying its status and body.
async fn ensure_success(response: Response) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body.trim().to_string()
    };
    Err(StorageError::http(status.as_u16(), message))
}

fn parse_endpoint(url: &str) -> StorageResult<Url> {
    Url::parse(url)
        .map_err(|e| StorageError::configuration(format!("invalid catalog endpoint '{url}': {e}")))
}

/// Append percent-encoded path segments to `base`.
fn join_segments<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> StorageResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| StorageError::configuration(format!("URL cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Listing timestamps look like `2024-03-01T12:30:00.123456`, in UTC.
fn parse_listing_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
