//! Resource Fetcher
//!
//! The provider client boundary: a [`ResourceClient`] answers point
//! requests and hands out pagers for list and aggregated list requests.
//! [`PagedList`] and [`PagedAggregatedList`] turn any page-at-a-time
//! [`PageSource`] into such pagers by following `nextPageToken`.

use super::registry::Service;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;

/// A request against one of the GCP APIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub service: Service,
    /// Path relative to the service base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Response field holding the resources of a list page
    pub items_field: String,
}

impl ApiRequest {
    pub fn new(service: Service, path: impl Into<String>) -> Self {
        Self {
            service,
            path: path.into(),
            query: Vec::new(),
            items_field: "items".to_string(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_items_field(mut self, field: impl Into<String>) -> Self {
        self.items_field = field.into();
        self
    }
}

/// Resources of one aggregated list entry, keyed by the provider's scope
/// key (`zones/us-central1-a`, `regions/us-central1`, `global`)
pub type ScopedResources = (String, Vec<Value>);

/// Sequential iterator over list results
#[async_trait]
pub trait ResourcePager: Send {
    /// Next resource, `None` once exhausted. After an error the pager is done.
    async fn next(&mut self) -> Option<Result<Value, ProviderError>>;
}

/// Sequential iterator over aggregated list results
#[async_trait]
pub trait AggregatedPager: Send {
    async fn next(&mut self) -> Option<Result<ScopedResources, ProviderError>>;
}

/// Provider client collaborator
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(&self, request: &ApiRequest) -> Result<Value, ProviderError>;

    fn list(&self, request: ApiRequest) -> Box<dyn ResourcePager>;

    fn aggregated_list(&self, request: ApiRequest) -> Box<dyn AggregatedPager> {
        Box::new(ErrorPager::new(ProviderError::Unsupported(format!(
            "aggregated list of {}",
            request.path
        ))))
    }
}

/// Something that can fetch one raw page of a list request
#[async_trait]
pub trait PageSource: Clone + Send + Sync + 'static {
    async fn fetch_page(
        &self,
        request: &ApiRequest,
        page_token: Option<&str>,
    ) -> Result<Value, ProviderError>;
}

/// Pager over a paginated list endpoint
pub struct PagedList<S: PageSource> {
    source: S,
    request: ApiRequest,
    buffer: VecDeque<Value>,
    next_token: Option<String>,
    done: bool,
}

impl<S: PageSource> PagedList<S> {
    pub fn new(source: S, request: ApiRequest) -> Self {
        Self {
            source,
            request,
            buffer: VecDeque::new(),
            next_token: None,
            done: false,
        }
    }
}

#[async_trait]
impl<S: PageSource> ResourcePager for PagedList<S> {
    async fn next(&mut self) -> Option<Result<Value, ProviderError>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }

            let page = match self
                .source
                .fetch_page(&self.request, self.next_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            self.buffer.extend(
                page.get(&self.request.items_field)
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            );
            self.next_token = next_page_token(&page);
            self.done = self.next_token.is_none();
            tracing::debug!(
                "Fetched page of {} ({} items, more: {})",
                self.request.path,
                self.buffer.len(),
                !self.done
            );
        }
    }
}

/// Pager over a compute aggregated list endpoint
pub struct PagedAggregatedList<S: PageSource> {
    source: S,
    request: ApiRequest,
    buffer: VecDeque<ScopedResources>,
    next_token: Option<String>,
    done: bool,
}

impl<S: PageSource> PagedAggregatedList<S> {
    pub fn new(source: S, request: ApiRequest) -> Self {
        Self {
            source,
            request,
            buffer: VecDeque::new(),
            next_token: None,
            done: false,
        }
    }
}

#[async_trait]
impl<S: PageSource> AggregatedPager for PagedAggregatedList<S> {
    async fn next(&mut self) -> Option<Result<ScopedResources, ProviderError>> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }

            let page = match self
                .source
                .fetch_page(&self.request, self.next_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            self.buffer
                .extend(scoped_entries(&page, &self.request.items_field));
            self.next_token = next_page_token(&page);
            self.done = self.next_token.is_none();
        }
    }
}

/// Split an aggregated page into per-scope resource lists.
/// Scopes that only carry a warning (no resources, or unreachable under
/// partial success) are skipped.
fn scoped_entries(page: &Value, items_field: &str) -> Vec<ScopedResources> {
    if let Some(unreachables) = page.get("unreachables").and_then(Value::as_array) {
        if !unreachables.is_empty() {
            tracing::warn!("Aggregated list skipped unreachable scopes: {:?}", unreachables);
        }
    }

    let Some(entries) = page.get("items").and_then(Value::as_object) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|(key, entry)| match entry.get(items_field).and_then(Value::as_array) {
            Some(resources) => Some((key.clone(), resources.clone())),
            None => {
                if let Some(code) = entry.pointer("/warning/code").and_then(Value::as_str) {
                    tracing::trace!("Aggregated scope {} has no {}: {}", key, items_field, code);
                }
                None
            }
        })
        .collect()
}

fn next_page_token(page: &Value) -> Option<String> {
    page.get("nextPageToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Pager replaying a fixed sequence of results
pub struct VecPager<T> {
    results: VecDeque<Result<T, ProviderError>>,
}

impl<T> VecPager<T> {
    pub fn new(results: Vec<Result<T, ProviderError>>) -> Self {
        Self {
            results: results.into(),
        }
    }
}

#[async_trait]
impl ResourcePager for VecPager<Value> {
    async fn next(&mut self) -> Option<Result<Value, ProviderError>> {
        self.results.pop_front()
    }
}

#[async_trait]
impl AggregatedPager for VecPager<ScopedResources> {
    async fn next(&mut self) -> Option<Result<ScopedResources, ProviderError>> {
        self.results.pop_front()
    }
}

/// Pager that fails once
pub struct ErrorPager {
    error: Option<ProviderError>,
}

impl ErrorPager {
    pub fn new(error: ProviderError) -> Self {
        Self { error: Some(error) }
    }
}

#[async_trait]
impl ResourcePager for ErrorPager {
    async fn next(&mut self) -> Option<Result<Value, ProviderError>> {
        self.error.take().map(Err)
    }
}

#[async_trait]
impl AggregatedPager for ErrorPager {
    async fn next(&mut self) -> Option<Result<ScopedResources, ProviderError>> {
        self.error.take().map(Err)
    }
}
