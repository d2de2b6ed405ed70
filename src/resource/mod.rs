//! Resource abstraction layer
//!
//! Resource kinds are described by static definitions; generic code turns
//! raw API responses into graph items according to those definitions.
//!
//! # Architecture
//!
//! - [`registry`] - Definition types and the table of known resource kinds
//! - [`definitions`] - Per-service definitions (compute, KMS, storage)
//! - [`path`] - Dot-path access into raw JSON resources
//! - [`references`] - Extracts linked queries from reference fields
//! - [`convert`] - Projects a raw resource into an item
//! - [`fetcher`] - Provider client boundary and paginated listing
//!
//! # Example
//!
//! ```ignore
//! use gcp_graph::resource::{get_resource, convert::to_item};
//!
//! let def = get_resource("compute-network").unwrap();
//! let item = to_item(def, &raw, &Scope::global("my-project"))?;
//! ```

pub mod convert;
pub mod definitions;
pub mod fetcher;
pub mod path;
pub mod references;
pub mod registry;

pub use registry::{all_resources, get_all_resource_keys, get_resource, ResourceDef, Service};
