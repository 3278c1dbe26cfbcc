//! Application configuration management.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigResult, ConfigurationError};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Object storage configuration.
    pub storage: StorageSettings,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogSettings,
}

/// Which backend serves the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendSettings {
    /// OpenStack Swift / Rackspace Cloud Files.
    #[default]
    Swift,
    /// Local filesystem (development only).
    LocalFs {
        /// Root directory; containers become subdirectories.
        root: PathBuf,
        /// Base URL that public object URLs are built from.
        #[serde(default)]
        public_url: Option<String>,
    },
}

impl BackendSettings {
    /// Get the backend name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Swift => "swift",
            Self::LocalFs { .. } => "local_fs",
        }
    }
}

/// Object storage configuration.
///
/// Supplied once when the repository is built and never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Backend selection.
    #[serde(default)]
    pub backend: BackendSettings,
    /// Account identity.
    #[serde(default)]
    pub username: String,
    /// Account API key.
    #[serde(default)]
    pub api_key: String,
    /// Identity endpoint used to authenticate.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Trust bundle reference, resolved by `TrustBundleLocator`.
    #[serde(default)]
    pub cacert: Option<String>,
    /// Container name.
    pub container: String,
    /// Catalog name of the object-store service.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Region the object-store service is scoped to.
    #[serde(default = "default_region")]
    pub region: String,
    /// Storage origin of the container, e.g. `//storage.example.com/c`.
    #[serde(default)]
    pub container_url: Option<String>,
    /// CDN origin that replaces the storage origin in public URLs.
    #[serde(default)]
    pub cdn_url: Option<String>,
    /// Retries after the first failed URL resolution.
    #[serde(default = "default_request_retries")]
    pub request_retries: u32,
    /// Delay between URL resolution attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Objects requested per listing page.
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,
}

fn default_endpoint() -> String {
    "https://lon.identity.api.rackspacecloud.com/v2.0/".to_string()
}

fn default_service_name() -> String {
    "cloudFiles".to_string()
}

fn default_region() -> String {
    "LON".to_string()
}

fn default_request_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    10
}

fn default_list_page_size() -> usize {
    10_000
}

impl StorageSettings {
    /// Create settings for a container with every other value defaulted.
    #[must_use]
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            backend: BackendSettings::default(),
            username: String::new(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            cacert: None,
            container: container.into(),
            service_name: default_service_name(),
            region: default_region(),
            container_url: None,
            cdn_url: None,
            request_retries: default_request_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            list_page_size: default_list_page_size(),
        }
    }

    /// Set the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendSettings) -> Self {
        self.backend = backend;
        self
    }

    /// Set the account credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.api_key = api_key.into();
        self
    }

    /// Set the identity endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the storage origin URL.
    #[must_use]
    pub fn with_container_url(mut self, url: impl Into<String>) -> Self {
        self.container_url = Some(url.into());
        self
    }

    /// Set the CDN origin URL.
    #[must_use]
    pub fn with_cdn_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_url = Some(url.into());
        self
    }

    /// Set the URL resolution retry policy.
    #[must_use]
    pub fn with_retries(mut self, retries: u32, delay_ms: u64) -> Self {
        self.request_retries = retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Set the listing page size.
    #[must_use]
    pub fn with_list_page_size(mut self, size: usize) -> Self {
        self.list_page_size = size;
        self
    }

    /// Delay between URL resolution attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Check the settings the selected backend cannot work without.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or invalid key.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.container.trim().is_empty() {
            return Err(ConfigurationError::missing("storage.container"));
        }
        if self.list_page_size == 0 {
            return Err(ConfigurationError::invalid(
                "storage.list_page_size",
                "must be greater than zero",
            ));
        }
        if self.backend == BackendSettings::Swift {
            if self.username.is_empty() {
                return Err(ConfigurationError::missing("storage.username"));
            }
            if self.api_key.is_empty() {
                return Err(ConfigurationError::missing("storage.api_key"));
            }
            if self.endpoint.is_empty() {
                return Err(ConfigurationError::missing("storage.endpoint"));
            }
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSettings {
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
    /// Filter directives used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> ConfigResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CLOUDSTASH").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
