//! Aggregated Lister
//!
//! Wildcard listing for compute resources: one aggregated list request per
//! configured project, run concurrently up to a fixed limit. Results from
//! every project are pushed to a shared sink as they arrive; a failing
//! project reports its error and the others carry on.

use super::sink::QuerySink;
use super::{convert_and_cache, AdapterOptions, ScopeGuard};
use crate::cache::ResultCache;
use crate::error::QueryError;
use crate::resource::fetcher::{ApiRequest, ResourceClient};
use crate::resource::registry::ResourceDef;
use crate::scope::Scope;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fans an aggregated list out over the configured projects
pub struct AggregatedLister {
    def: &'static ResourceDef,
    client: Arc<dyn ResourceClient>,
    scopes: ScopeGuard,
    cache: Arc<ResultCache>,
    options: AdapterOptions,
}

impl AggregatedLister {
    pub fn new(
        def: &'static ResourceDef,
        client: Arc<dyn ResourceClient>,
        scopes: ScopeGuard,
        cache: Arc<ResultCache>,
        options: AdapterOptions,
    ) -> Self {
        Self {
            def,
            client,
            scopes,
            cache,
            options,
        }
    }

    fn request(&self, project: &str) -> Result<ApiRequest, QueryError> {
        let collection = self.def.aggregated.ok_or_else(|| {
            QueryError::no_scope(format!("{} has no aggregated listing", self.def.item_type))
        })?;
        Ok(ApiRequest::new(
            self.def.service,
            format!("projects/{}/aggregated/{}", project, collection),
        )
        .with_query("returnPartialSuccess", "true")
        .with_items_field(collection))
    }

    /// List every project and push the results to `sink`. Returns once all
    /// project tasks have finished.
    pub async fn run(&self, sink: &QuerySink) {
        let projects = self.scopes.projects();
        let limit = self.options.max_concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();

        tracing::debug!(
            "Aggregated list of {} over {} projects (limit {})",
            self.def.item_type,
            projects.len(),
            limit
        );

        for project in projects {
            let request = match self.request(&project) {
                Ok(request) => request,
                Err(e) => {
                    sink.send_error(e);
                    return;
                }
            };

            let permit = tokio::select! {
                biased;
                _ = self.options.cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let task = ProjectTask {
                def: self.def,
                client: self.client.clone(),
                scopes: self.scopes.clone(),
                cache: self.cache.clone(),
                options: self.options.clone(),
                sink: sink.clone(),
                project,
            };
            tasks.spawn(async move {
                task.run(request).await;
                drop(permit);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Aggregated list task for {} failed: {}", self.def.item_type, e);
                sink.send_error(QueryError::other(format!("list task failed: {}", e)));
            }
        }

        if self.options.cancel.is_cancelled() {
            sink.send_error(QueryError::cancelled());
        }
    }
}

/// Everything one project's listing needs, owned so it can be spawned
struct ProjectTask {
    def: &'static ResourceDef,
    client: Arc<dyn ResourceClient>,
    scopes: ScopeGuard,
    cache: Arc<ResultCache>,
    options: AdapterOptions,
    sink: QuerySink,
    project: String,
}

impl ProjectTask {
    async fn run(self, request: ApiRequest) {
        let mut pager = self.client.aggregated_list(request);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.options.cancel.cancelled() => return,
                next = pager.next() => next,
            };

            let (key, resources) = match next {
                None => return,
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    tracing::warn!(
                        "Aggregated list of {} in project {} failed: {}",
                        self.def.item_type,
                        self.project,
                        e
                    );
                    self.sink.send_error(QueryError::from_provider(&e));
                    return;
                }
            };

            let Some(scope) = self.configured_scope(&key) else {
                continue;
            };

            for raw in &resources {
                match convert_and_cache(self.def, &self.cache, self.options.cache_ttl, raw, &scope).await {
                    Ok(item) => {
                        if !self.sink.send_item(item) {
                            return;
                        }
                    }
                    Err(e) => {
                        self.sink.send_error(e);
                        return;
                    }
                }
            }
        }
    }

    /// Scope of an aggregated entry if it is one we were configured for
    fn configured_scope(&self, key: &str) -> Option<Scope> {
        let Some(scope) = Scope::from_aggregated_key(&self.project, key) else {
            tracing::trace!("Ignoring unrecognised aggregated key {}", key);
            return None;
        };
        if !self.scopes.contains(&scope) {
            tracing::trace!("Ignoring {} results in unconfigured scope {}", self.def.item_type, scope);
            return None;
        }
        Some(scope)
    }
}
