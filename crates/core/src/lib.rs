//! Core storage logic for Cloudstash.
//!
//! # Modules
//!
//! - `storage` - Object repository facade, backend traits, and backends

pub mod storage;

pub use storage::{
    ObjectPayload, ObjectRepository, StorageError, StorageResult, StoredObject, UrlType,
};
