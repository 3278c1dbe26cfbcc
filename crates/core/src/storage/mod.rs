//! Object storage facade for a single container.
//!
//! Every operation funnels through a lazily built chain of backend handles:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ObjectRepository                          │
//! │   list / has / get / save / delete / purge, get_url (+ retry),   │
//! │   container_url, CDN origin rewrite                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Connector ──authenticate──▶ Session ──object_store──▶ ObjectStore │
//! │                                      ──container──▶ Container     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ SwiftConnector (Cloud Files, reqwest) │ OperatorConnector (OpenDAL)│
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod backend;
mod error;
mod operator;
mod repository;
mod retry;
mod swift;
mod types;
mod url;


pub use backend::{Connector, Container, ObjectStore, Session};
pub use error::{StorageError, StorageResult};
pub use operator::{CONTAINER_MARKER, OperatorConnector};
pub use repository::ObjectRepository;
pub use retry::RetryPolicy;
pub use swift::SwiftConnector;
pub use types::{Credentials, ObjectPayload, ObjectSource, StoredObject, UrlType};
pub use url::{container_base_url, rewrite_origin};
