//! Resource graph adapters for Google Cloud Platform
//!
//! Discovers GCP resources (compute, Cloud KMS, Cloud Storage) and exposes
//! them as graph items linked to the resources they reference.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod gcp;
pub mod item;
pub mod resource;
pub mod scope;

pub use adapter::{build_adapters, Adapter, AdapterOptions, ResourceAdapter};
pub use cache::ResultCache;
pub use error::{ErrorKind, QueryError};
pub use item::{Item, LinkedQuery};
pub use scope::Scope;
