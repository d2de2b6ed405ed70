//! GCP API interaction module
//!
//! Authentication, HTTP and the provider client the resource adapters use.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - [`client::GcpClient`], the live `ResourceClient`
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use gcp_graph::gcp::client::GcpClient;
//! use gcp_graph::resource::fetcher::{ApiRequest, ResourceClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new().await?;
//!     let request = ApiRequest::new(Service::Compute, "projects/my-project/global/networks/default");
//!     let network = client.get(&request).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
