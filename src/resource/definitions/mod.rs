//! Resource definitions, one module per GCP service
//!
//! - [`compute`] - Compute Engine (VMs, disks, images, networking, load balancing)
//! - [`kms`] - Cloud KMS (key rings, crypto keys)
//! - [`storage`] - Cloud Storage (buckets)

pub mod compute;
pub mod kms;
pub mod storage;
