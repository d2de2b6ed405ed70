//! Resource Adapters
//!
//! An adapter answers queries for one resource kind: it validates the
//! caller's scope against its configured allow-list, issues provider
//! requests, converts the results into graph items and caches them.
//!
//! # Module Structure
//!
//! - [`sink`] - Channel-backed sinks for streaming queries
//! - [`aggregate`] - Wildcard listing fanned out over projects
//!
//! # Example
//!
//! ```ignore
//! use gcp_graph::adapter::{build_adapters, Adapter, AdapterOptions};
//!
//! async fn example(client: Arc<dyn ResourceClient>, scopes: Vec<Scope>) -> anyhow::Result<()> {
//!     let cache = Arc::new(ResultCache::default());
//!     let adapters = build_adapters(client, &scopes, cache, AdapterOptions::default())?;
//!     let disks = adapters.iter().find(|a| a.item_type() == "compute-disk").unwrap();
//!     let disk = disks.get("my-project.us-central1-a", &["boot-disk"]).await?;
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod sink;

use crate::cache::{CacheKey, ResultCache, DEFAULT_CACHE_TTL};
use crate::error::{DefinitionError, QueryError};
use crate::item::{join_key_parts, Item};
use crate::resource::convert::to_item;
use crate::resource::fetcher::{ApiRequest, ResourceClient, ResourcePager};
use crate::resource::registry::{all_resources, render_template, Endpoint, ResourceDef};
use crate::scope::Scope;
use aggregate::AggregatedLister;
use async_trait::async_trait;
use serde_json::Value;
use sink::{query_channel, QuerySink};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use sink::{QueryEvent, QueryResults, QueryStream};

/// Default cap on concurrent aggregated list tasks
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Query contract every resource adapter implements
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Item type produced by this adapter
    fn item_type(&self) -> &'static str;

    /// Scopes this adapter answers for
    fn scopes(&self) -> &[Scope];

    fn supports_wildcard(&self) -> bool;

    /// Point lookup of one resource
    async fn get(&self, scope: &str, query: &[&str]) -> Result<Item, QueryError>;

    /// Every resource in a scope, or the first error
    async fn list(&self, scope: &str) -> Result<Vec<Item>, QueryError>;

    /// Every resource in a scope, pushed to `sink` as it is converted
    async fn list_stream(&self, scope: &str, sink: &QuerySink);

    /// Resources under the parent named by `query`
    async fn search(&self, scope: &str, query: &[&str]) -> Result<Vec<Item>, QueryError>;

    async fn search_stream(&self, scope: &str, query: &[&str], sink: &QuerySink);
}

/// Tunables shared by the adapters of one session
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub cache_ttl: Duration,
    pub max_concurrency: usize,
    /// Serve point lookups from the cache when possible
    pub use_cache: bool,
    pub cancel: CancellationToken,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            use_cache: true,
            cancel: CancellationToken::new(),
        }
    }
}

/// The set of scopes an adapter is allowed to answer for
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    scopes: Arc<[Scope]>,
}

impl ScopeGuard {
    /// Wildcards and duplicates are dropped, order is kept
    pub fn new(scopes: impl IntoIterator<Item = Scope>) -> Self {
        let mut unique: Vec<Scope> = Vec::new();
        for scope in scopes {
            if !scope.is_wildcard() && !unique.contains(&scope) {
                unique.push(scope);
            }
        }
        Self {
            scopes: unique.into(),
        }
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }

    /// Parse a scope and check it is configured. The wildcard passes through.
    pub fn resolve(&self, text: &str) -> Result<Scope, QueryError> {
        let scope = Scope::parse(text)?;
        if scope.is_wildcard() || self.contains(&scope) {
            Ok(scope)
        } else {
            Err(QueryError::no_scope(format!("scope '{}' is not configured", scope)))
        }
    }

    /// Distinct projects of the configured scopes, in configuration order
    pub fn projects(&self) -> Vec<String> {
        let mut projects: Vec<String> = Vec::new();
        for project in self.scopes.iter().filter_map(Scope::project_id) {
            if !projects.iter().any(|p| p == project) {
                projects.push(project.to_string());
            }
        }
        projects
    }
}

/// Adapter for any resource kind described by a [`ResourceDef`]
pub struct ResourceAdapter {
    def: &'static ResourceDef,
    client: Arc<dyn ResourceClient>,
    scopes: ScopeGuard,
    cache: Arc<ResultCache>,
    options: AdapterOptions,
}

impl ResourceAdapter {
    /// Build an adapter; every scope must be served by one of the
    /// definition's endpoints
    pub fn new(
        def: &'static ResourceDef,
        client: Arc<dyn ResourceClient>,
        scopes: Vec<Scope>,
        cache: Arc<ResultCache>,
        options: AdapterOptions,
    ) -> Result<Self, DefinitionError> {
        def.validate()?;

        let scopes = ScopeGuard::new(scopes);
        if scopes.scopes().is_empty() {
            return Err(DefinitionError::NoScopes {
                item_type: def.item_type.to_string(),
            });
        }
        if let Some(unserved) = scopes.scopes().iter().find(|s| !def.serves(s)) {
            return Err(DefinitionError::UnservedScope {
                item_type: def.item_type.to_string(),
                scope: unserved.to_string(),
            });
        }

        Ok(Self {
            def,
            client,
            scopes,
            cache,
            options,
        })
    }

    /// Build an adapter for the subset of `scopes` the definition serves,
    /// `None` if it serves none of them
    pub fn for_scopes(
        def: &'static ResourceDef,
        client: Arc<dyn ResourceClient>,
        scopes: &[Scope],
        cache: Arc<ResultCache>,
        options: AdapterOptions,
    ) -> Result<Option<Self>, DefinitionError> {
        let served: Vec<Scope> = scopes.iter().filter(|s| def.serves(s)).cloned().collect();
        if served.is_empty() {
            return Ok(None);
        }
        Self::new(def, client, served, cache, options).map(Some)
    }

    fn resolve(&self, text: &str) -> Result<Scope, QueryError> {
        let scope = self.scopes.resolve(text)?;
        if scope.is_wildcard() && !self.def.supports_wildcard() {
            return Err(QueryError::no_scope(format!(
                "{} does not support the wildcard scope",
                self.def.item_type
            )));
        }
        Ok(scope)
    }

    fn endpoint(&self, scope: &Scope) -> Result<&'static Endpoint, QueryError> {
        scope
            .location_kind()
            .and_then(|kind| self.def.endpoint_for(kind))
            .ok_or_else(|| {
                QueryError::no_scope(format!("{} is not served in scope {}", self.def.item_type, scope))
            })
    }

    /// Parts become path segments, so `.` and `..` would be resolved
    /// against the URL rather than sent
    fn check_parts(&self, query: &[&str], expected: usize, op: &str) -> Result<(), QueryError> {
        let malformed = |p: &&str| p.is_empty() || *p == "." || *p == "..";
        if query.len() != expected || query.iter().any(malformed) {
            return Err(QueryError::other(format!(
                "{} {} takes {} non-empty query part(s), got {:?}",
                self.def.item_type, op, expected, query
            )));
        }
        Ok(())
    }

    fn request(&self, endpoint: &Endpoint, path: String, scope: &Scope) -> Result<ApiRequest, QueryError> {
        let mut request = ApiRequest::new(self.def.service, path).with_items_field(self.def.items_field);
        for (key, value) in endpoint.render_query(scope)? {
            request = request.with_query(key, value);
        }
        Ok(request)
    }

    fn list_request(&self, scope: &Scope) -> Result<ApiRequest, QueryError> {
        let endpoint = self.endpoint(scope)?;
        let template = endpoint.list.ok_or_else(|| {
            QueryError::other(format!("{} does not support list", self.def.item_type))
        })?;
        self.request(endpoint, render_template(template, scope, &[])?, scope)
    }

    fn search_request(&self, scope: &Scope, query: &[&str]) -> Result<ApiRequest, QueryError> {
        if !self.def.supports_search() {
            return Err(QueryError::other(format!("{} does not support search", self.def.item_type)));
        }
        self.check_parts(query, self.def.search_parts, "search")?;
        let endpoint = self.endpoint(scope)?;
        let template = endpoint.search.ok_or_else(|| {
            QueryError::other(format!("{} does not support search in scope {}", self.def.item_type, scope))
        })?;
        self.request(endpoint, render_template(template, scope, query)?, scope)
    }

    fn aggregated_lister(&self) -> AggregatedLister {
        AggregatedLister::new(
            self.def,
            self.client.clone(),
            self.scopes.clone(),
            self.cache.clone(),
            self.options.clone(),
        )
    }

    /// Drain a pager, converting and caching every resource and handing it
    /// to `emit`. Stops at the first error, on cancellation, or when `emit`
    /// returns `false`.
    async fn drain<F>(&self, mut pager: Box<dyn ResourcePager>, scope: &Scope, mut emit: F) -> Result<(), QueryError>
    where
        F: FnMut(Item) -> bool + Send,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.options.cancel.cancelled() => return Err(QueryError::cancelled()),
                next = pager.next() => next,
            };

            let raw = match next {
                None => return Ok(()),
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    tracing::debug!("{} listing in {} failed: {}", self.def.item_type, scope, e);
                    return Err(QueryError::from_provider(&e));
                }
            };

            let item = convert_and_cache(self.def, &self.cache, self.options.cache_ttl, &raw, scope).await?;
            if !emit(item) {
                tracing::debug!("{} listing in {}: receiver gone, stopping", self.def.item_type, scope);
                return Ok(());
            }
        }
    }

    async fn collect(&self, request: ApiRequest, scope: &Scope) -> Result<Vec<Item>, QueryError> {
        let mut items = Vec::new();
        self.drain(self.client.list(request), scope, |item| {
            items.push(item);
            true
        })
        .await?;
        Ok(items)
    }

    async fn stream(&self, request: ApiRequest, scope: &Scope, sink: &QuerySink) {
        let result = self
            .drain(self.client.list(request), scope, |item| sink.send_item(item))
            .await;
        if let Err(e) = result {
            sink.send_error(e);
        }
    }

    /// Run the aggregated lister to completion and gather its output
    async fn collect_wildcard(&self) -> QueryResults {
        let (sink, stream) = query_channel();
        self.aggregated_lister().run(&sink).await;
        drop(sink);
        stream.collect().await
    }
}

/// Convert a raw resource and write the item to the cache
pub(crate) async fn convert_and_cache(
    def: &ResourceDef,
    cache: &ResultCache,
    ttl: Duration,
    raw: &Value,
    scope: &Scope,
) -> Result<Item, QueryError> {
    let item = to_item(def, raw, scope)?;
    if let Some(key) = CacheKey::for_item(&item) {
        cache.store(item.clone(), ttl, key).await;
    }
    Ok(item)
}

#[async_trait]
impl Adapter for ResourceAdapter {
    fn item_type(&self) -> &'static str {
        self.def.item_type
    }

    fn scopes(&self) -> &[Scope] {
        self.scopes.scopes()
    }

    fn supports_wildcard(&self) -> bool {
        self.def.supports_wildcard()
    }

    async fn get(&self, scope: &str, query: &[&str]) -> Result<Item, QueryError> {
        let scope = self.resolve(scope)?;
        self.check_parts(query, self.def.key_parts, "get")?;
        let key = join_key_parts(query);

        if scope.is_wildcard() {
            let results = self.collect_wildcard().await;
            if let Some(item) = results.items.into_iter().find(|i| i.unique_value() == Some(key.as_str())) {
                return Ok(item);
            }
            return Err(results.errors.into_iter().next().unwrap_or_else(|| {
                QueryError::not_found(format!("{} '{}' not found in any scope", self.def.item_type, key))
            }));
        }

        if self.options.use_cache {
            let cache_key = CacheKey::new(self.def.item_type, &scope, &key);
            if let Some(item) = self.cache.lookup(&cache_key).await {
                tracing::debug!("Cache hit for {} {}", self.def.item_type, cache_key.fingerprint);
                return Ok(item);
            }
        }

        let endpoint = self.endpoint(&scope)?;
        let request = ApiRequest::new(self.def.service, render_template(endpoint.get, &scope, query)?);

        let raw = tokio::select! {
            biased;
            _ = self.options.cancel.cancelled() => return Err(QueryError::cancelled()),
            raw = self.client.get(&request) => raw.map_err(|e| QueryError::from_provider(&e))?,
        };

        let item = to_item(self.def, &raw, &scope)?;
        if item.unique_value() != Some(key.as_str()) {
            return Err(QueryError::other(format!(
                "{} '{}' resolved to a resource identified as {:?}",
                self.def.item_type,
                key,
                item.unique_value()
            )));
        }
        self.cache
            .store(item.clone(), self.options.cache_ttl, CacheKey::new(self.def.item_type, &scope, &key))
            .await;
        Ok(item)
    }

    async fn list(&self, scope: &str) -> Result<Vec<Item>, QueryError> {
        let scope = self.resolve(scope)?;

        if scope.is_wildcard() {
            let results = self.collect_wildcard().await;
            if results.items.is_empty() {
                if let Some(error) = results.errors.into_iter().next() {
                    return Err(error);
                }
            } else if !results.errors.is_empty() {
                tracing::warn!(
                    "{} wildcard list returned {} items with {} errors",
                    self.def.item_type,
                    results.items.len(),
                    results.errors.len()
                );
            }
            return Ok(results.items);
        }

        let request = self.list_request(&scope)?;
        self.collect(request, &scope).await
    }

    async fn list_stream(&self, scope: &str, sink: &QuerySink) {
        let scope = match self.resolve(scope) {
            Ok(scope) => scope,
            Err(e) => {
                sink.send_error(e);
                return;
            }
        };

        if scope.is_wildcard() {
            self.aggregated_lister().run(sink).await;
            return;
        }

        match self.list_request(&scope) {
            Ok(request) => self.stream(request, &scope, sink).await,
            Err(e) => {
                sink.send_error(e);
            }
        }
    }

    async fn search(&self, scope: &str, query: &[&str]) -> Result<Vec<Item>, QueryError> {
        let scope = self.resolve(scope)?;
        if scope.is_wildcard() {
            return Err(QueryError::no_scope("search does not support the wildcard scope"));
        }
        let request = self.search_request(&scope, query)?;
        self.collect(request, &scope).await
    }

    async fn search_stream(&self, scope: &str, query: &[&str], sink: &QuerySink) {
        let request = self.resolve(scope).and_then(|scope| {
            if scope.is_wildcard() {
                return Err(QueryError::no_scope("search does not support the wildcard scope"));
            }
            let request = self.search_request(&scope, query)?;
            Ok((request, scope))
        });

        match request {
            Ok((request, scope)) => self.stream(request, &scope, sink).await,
            Err(e) => {
                sink.send_error(e);
            }
        }
    }
}

/// One adapter per known resource kind that serves at least one of `scopes`
pub fn build_adapters(
    client: Arc<dyn ResourceClient>,
    scopes: &[Scope],
    cache: Arc<ResultCache>,
    options: AdapterOptions,
) -> Result<Vec<ResourceAdapter>, DefinitionError> {
    let mut adapters = Vec::new();
    for def in all_resources() {
        match ResourceAdapter::for_scopes(def, client.clone(), scopes, cache.clone(), options.clone())? {
            Some(adapter) => adapters.push(adapter),
            None => tracing::debug!("No configured scope serves {}", def.item_type),
        }
    }
    Ok(adapters)
}
