//! Shared test fixtures: a scripted provider client that counts calls

#![allow(dead_code)]

use async_trait::async_trait;
use gcp_graph::error::ProviderError;
use gcp_graph::resource::fetcher::{
    AggregatedPager, ApiRequest, ResourceClient, ResourcePager, ScopedResources, VecPager,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider client replaying canned responses keyed by request path
#[derive(Default)]
pub struct MockClient {
    gets: Mutex<HashMap<String, Result<Value, ProviderError>>>,
    lists: Mutex<HashMap<String, Vec<Result<Value, ProviderError>>>>,
    aggregated: Mutex<HashMap<String, Vec<Result<ScopedResources, ProviderError>>>>,
    requests: Mutex<Vec<ApiRequest>>,
    calls: AtomicUsize,
    aggregated_delay: Option<Duration>,
    tracker: Arc<ConcurrencyTracker>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregated pagers sleep this long before yielding, so overlap is observable
    pub fn with_aggregated_delay(mut self, delay: Duration) -> Self {
        self.aggregated_delay = Some(delay);
        self
    }

    pub fn on_get(self, path: &str, response: Result<Value, ProviderError>) -> Self {
        self.gets.lock().unwrap().insert(path.to_string(), response);
        self
    }

    pub fn on_list(self, path: &str, results: Vec<Result<Value, ProviderError>>) -> Self {
        self.lists.lock().unwrap().insert(path.to_string(), results);
        self
    }

    pub fn on_aggregated(self, path: &str, results: Vec<Result<ScopedResources, ProviderError>>) -> Self {
        self.aggregated.lock().unwrap().insert(path.to_string(), results);
        self
    }

    /// Number of provider calls (gets, lists and aggregated lists)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of aggregated pagers active at once
    pub fn max_concurrent(&self) -> usize {
        self.tracker.max.load(Ordering::SeqCst)
    }

    fn record(&self, request: &ApiRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl ResourceClient for MockClient {
    async fn get(&self, request: &ApiRequest) -> Result<Value, ProviderError> {
        self.record(request);
        self.gets
            .lock()
            .unwrap()
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::status(404, format!("no such resource {}", request.path))))
    }

    fn list(&self, request: ApiRequest) -> Box<dyn ResourcePager> {
        self.record(&request);
        let results = self.lists.lock().unwrap().get(&request.path).cloned().unwrap_or_default();
        Box::new(VecPager::new(results))
    }

    fn aggregated_list(&self, request: ApiRequest) -> Box<dyn AggregatedPager> {
        self.record(&request);
        let results = self
            .aggregated
            .lock()
            .unwrap()
            .get(&request.path)
            .cloned()
            .unwrap_or_default();
        Box::new(TrackedPager {
            inner: VecPager::new(results),
            delay: self.aggregated_delay,
            tracker: self.tracker.clone(),
            started: false,
        })
    }
}

#[derive(Default)]
struct ConcurrencyTracker {
    active: AtomicUsize,
    max: AtomicUsize,
}

/// Aggregated pager that counts itself active from first poll until exhausted
struct TrackedPager {
    inner: VecPager<ScopedResources>,
    delay: Option<Duration>,
    tracker: Arc<ConcurrencyTracker>,
    started: bool,
}

#[async_trait]
impl AggregatedPager for TrackedPager {
    async fn next(&mut self) -> Option<Result<ScopedResources, ProviderError>> {
        if !self.started {
            self.started = true;
            let active = self.tracker.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.tracker.max.fetch_max(active, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.inner.next().await;
        if !matches!(next, Some(Ok(_))) {
            self.tracker.active.fetch_sub(1, Ordering::SeqCst);
        }
        next
    }
}
