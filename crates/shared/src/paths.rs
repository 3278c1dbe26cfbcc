//! Path helpers for locating local files referenced by configuration.

use std::path::{Path, PathBuf};

use crate::error::{ConfigResult, ConfigurationError};

/// Environment variable overriding the storage directory.
pub const STORAGE_DIR_ENV: &str = "CLOUDSTASH_STORAGE_DIR";

/// Default storage directory, relative to the working directory.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Resolves trust bundle references to filesystem paths.
///
/// Relative references are looked up in the storage directory; absolute
/// references are used as given.
#[derive(Debug, Clone)]
pub struct TrustBundleLocator {
    base_dir: PathBuf,
}

impl TrustBundleLocator {
    /// Create a locator rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a locator rooted at `$CLOUDSTASH_STORAGE_DIR`, or `./storage`.
    #[must_use]
    pub fn from_env() -> Self {
        let base_dir = std::env::var_os(STORAGE_DIR_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from);
        Self::new(base_dir)
    }

    /// Directory relative references are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a reference to a path without touching the filesystem.
    #[must_use]
    pub fn locate(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Map a reference to the path of an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is empty or no file exists there.
    pub fn resolve(&self, reference: &str) -> ConfigResult<PathBuf> {
        if reference.trim().is_empty() {
            return Err(ConfigurationError::missing("storage.cacert"));
        }
        let path = self.locate(reference);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ConfigurationError::TrustBundleNotFound(path))
        }
    }
}

impl Default for TrustBundleLocator {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_DIR)
    }
}
