//! GCP Client
//!
//! Combines authentication and HTTP into the [`ResourceClient`] the
//! adapters talk to. Requests name a service and a path relative to that
//! service's base URL; the base URLs can be pointed elsewhere for testing.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::error::ProviderError;
use crate::resource::fetcher::{
    AggregatedPager, ApiRequest, PageSource, PagedAggregatedList, PagedList, ResourceClient,
    ResourcePager,
};
use crate::resource::registry::Service;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

const COMPUTE_BASE_URL: &str = "https://compute.googleapis.com/compute/v1/";
const CLOUDKMS_BASE_URL: &str = "https://cloudkms.googleapis.com/v1/";
const STORAGE_BASE_URL: &str = "https://storage.googleapis.com/storage/v1/";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    base_urls: Arc<HashMap<Service, Url>>,
}

impl GcpClient {
    /// Client authenticated with Application Default Credentials
    pub async fn new() -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;
        Self::with_credentials(credentials)
    }

    pub fn with_credentials(credentials: GcpCredentials) -> Result<Self> {
        let mut base_urls = HashMap::new();
        for (service, base) in [
            (Service::Compute, COMPUTE_BASE_URL),
            (Service::CloudKms, CLOUDKMS_BASE_URL),
            (Service::Storage, STORAGE_BASE_URL),
        ] {
            base_urls.insert(service, Url::parse(base).context("Invalid base URL")?);
        }

        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            base_urls: Arc::new(base_urls),
        })
    }

    /// Send requests for `service` to `base` instead of the Google endpoint
    pub fn with_base_url(mut self, service: Service, base: &str) -> Result<Self> {
        // Without a trailing slash `join` would replace the last segment
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let url = Url::parse(&base).with_context(|| format!("Invalid base URL {}", base))?;
        Arc::make_mut(&mut self.base_urls).insert(service, url);
        Ok(self)
    }

    /// Absolute URL of a request, with an optional page token
    pub fn request_url(&self, request: &ApiRequest, page_token: Option<&str>) -> Result<Url, ProviderError> {
        let base = self.base_urls.get(&request.service).ok_or_else(|| {
            ProviderError::Unsupported(format!("no base URL for {}", request.service.name()))
        })?;
        let mut url = base
            .join(&request.path)
            .map_err(|e| ProviderError::Unsupported(format!("bad request path {}: {}", request.path, e)))?;

        if !request.query.is_empty() || page_token.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }

    async fn token(&self) -> Result<String, ProviderError> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| ProviderError::status(401, format!("{:#}", e)))
    }

    /// GET an absolute URL. A 401 with refreshable credentials drops the
    /// cached token and tries once more.
    pub async fn get_url(&self, url: &Url) -> Result<Value, ProviderError> {
        let token = self.token().await?;
        match self.http.get(url.as_str(), &token).await {
            Err(ProviderError::Status { code: 401, .. }) if self.credentials.can_refresh() => {
                tracing::debug!("Token rejected for {}, refreshing", url);
                let token = self
                    .credentials
                    .refresh_token()
                    .await
                    .map_err(|e| ProviderError::status(401, format!("{:#}", e)))?;
                self.http.get(url.as_str(), &token).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl PageSource for GcpClient {
    async fn fetch_page(&self, request: &ApiRequest, page_token: Option<&str>) -> Result<Value, ProviderError> {
        let url = self.request_url(request, page_token)?;
        self.get_url(&url).await
    }
}

#[async_trait]
impl ResourceClient for GcpClient {
    async fn get(&self, request: &ApiRequest) -> Result<Value, ProviderError> {
        let url = self.request_url(request, None)?;
        self.get_url(&url).await
    }

    fn list(&self, request: ApiRequest) -> Box<dyn ResourcePager> {
        Box::new(PagedList::new(self.clone(), request))
    }

    fn aggregated_list(&self, request: ApiRequest) -> Box<dyn AggregatedPager> {
        Box::new(PagedAggregatedList::new(self.clone(), request))
    }
}
