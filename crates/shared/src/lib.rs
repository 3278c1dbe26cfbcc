//! Shared configuration, errors, and path helpers for Cloudstash.
//!
//! This crate provides the pieces every other crate consumes:
//! - Layered configuration loading (files + environment)
//! - Configuration error types
//! - Trust bundle lookup for TLS certificate files

pub mod config;
pub mod error;
pub mod paths;

pub use config::{AppConfig, BackendSettings, LogSettings, StorageSettings};
pub use error::{ConfigResult, ConfigurationError};
pub use paths::TrustBundleLocator;
