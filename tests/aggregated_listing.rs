//! Wildcard listing across projects and zones

mod common;

use common::MockClient;
use gcp_graph::adapter::sink::query_channel;
use gcp_graph::adapter::{Adapter, AdapterOptions, QueryEvent, QueryResults, ResourceAdapter};
use gcp_graph::cache::ResultCache;
use gcp_graph::error::{ErrorKind, ProviderError};
use gcp_graph::resource::definitions::compute;
use gcp_graph::scope::Scope;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

static ZONES: [&str; 2] = ["us-central1-a", "us-central1-b"];

fn instance(project: &str, zone: &str, name: &str) -> Value {
    json!({
        "name": name,
        "status": "RUNNING",
        "zone": format!("https://www.googleapis.com/compute/v1/projects/{}/zones/{}", project, zone),
    })
}

fn aggregated_path(project: &str) -> String {
    format!("projects/{}/aggregated/instances", project)
}

/// Two instances per zone, plus an instance in a zone nobody configured
fn project_listing(project: &str) -> Vec<Result<(String, Vec<Value>), ProviderError>> {
    let mut entries: Vec<_> = ZONES
        .iter()
        .map(|zone| {
            Ok((
                format!("zones/{}", zone),
                vec![
                    instance(project, zone, &format!("{}-{}-1", project, zone)),
                    instance(project, zone, &format!("{}-{}-2", project, zone)),
                ],
            ))
        })
        .collect();
    entries.push(Ok((
        "zones/europe-west1-b".to_string(),
        vec![instance(project, "europe-west1-b", "stray")],
    )));
    entries
}

fn instance_adapter(client: Arc<MockClient>, projects: &[&str], options: AdapterOptions) -> ResourceAdapter {
    let scopes = projects
        .iter()
        .flat_map(|p| ZONES.iter().map(move |z| Scope::zonal(*p, *z)))
        .collect();
    ResourceAdapter::new(&compute::INSTANCE, client, scopes, Arc::new(ResultCache::default()), options)
        .expect("instance adapter should build")
}

#[tokio::test]
async fn test_wildcard_list_is_union_without_duplicates() {
    let client = Arc::new(
        MockClient::new()
            .on_aggregated(&aggregated_path("alpha-project"), project_listing("alpha-project"))
            .on_aggregated(&aggregated_path("beta-project"), project_listing("beta-project")),
    );
    let adapter = instance_adapter(client.clone(), &["alpha-project", "beta-project"], AdapterOptions::default());

    let items = adapter.list("*").await.unwrap();
    let names: HashSet<_> = items.iter().filter_map(|i| i.unique_value()).collect();
    assert_eq!(items.len(), 8);
    assert_eq!(names.len(), 8);
    assert!(!names.contains("stray"));

    for item in &items {
        let name = item.unique_value().unwrap();
        let expected = ZONES
            .iter()
            .find(|z| name.contains(*z))
            .map(|z| Scope::zonal(item.scope.project_id().unwrap(), *z));
        assert_eq!(Some(item.scope.clone()), expected);
    }

    // One aggregated request per project, partial success requested
    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    for request in requests {
        assert!(request.query.contains(&("returnPartialSuccess".to_string(), "true".to_string())));
        assert_eq!(request.items_field, "instances");
    }
}

#[tokio::test]
async fn test_failing_project_does_not_block_others() {
    let mut failing = vec![Ok((
        "zones/us-central1-a".to_string(),
        vec![instance("beta-project", "us-central1-a", "before-failure")],
    ))];
    failing.push(Err(ProviderError::status(403, "compute API disabled")));

    let client = Arc::new(
        MockClient::new()
            .on_aggregated(&aggregated_path("alpha-project"), project_listing("alpha-project"))
            .on_aggregated(&aggregated_path("beta-project"), failing),
    );
    let adapter = instance_adapter(client, &["alpha-project", "beta-project"], AdapterOptions::default());

    let (sink, stream) = query_channel();
    adapter.list_stream("*", &sink).await;
    drop(sink);
    let results = stream.collect().await;

    assert_eq!(results.items.len(), 5);
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].kind, ErrorKind::PermissionDenied);

    // The collecting form keeps the items and drops the error
    let items = adapter.list("*").await.unwrap();
    assert_eq!(items.len(), 5);
}

#[tokio::test]
async fn test_wildcard_list_with_only_errors() {
    let client = Arc::new(MockClient::new().on_aggregated(
        &aggregated_path("alpha-project"),
        vec![Err(ProviderError::status(401, "token expired"))],
    ));
    let adapter = instance_adapter(client, &["alpha-project"], AdapterOptions::default());

    let err = adapter.list("*").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_wildcard_get_finds_item_in_any_project() {
    let client = Arc::new(
        MockClient::new()
            .on_aggregated(&aggregated_path("alpha-project"), project_listing("alpha-project"))
            .on_aggregated(&aggregated_path("beta-project"), project_listing("beta-project")),
    );
    let adapter = instance_adapter(client, &["alpha-project", "beta-project"], AdapterOptions::default());

    let item = adapter.get("*", &["beta-project-us-central1-b-2"]).await.unwrap();
    assert_eq!(item.scope, Scope::zonal("beta-project", "us-central1-b"));

    let err = adapter.get("*", &["nope"]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let projects = ["alpha-project", "beta-project", "gamma-project", "delta-project"];
    let mut client = MockClient::new().with_aggregated_delay(Duration::from_millis(20));
    for project in projects {
        client = client.on_aggregated(&aggregated_path(project), project_listing(project));
    }
    let client = Arc::new(client);
    let options = AdapterOptions {
        max_concurrency: 2,
        ..AdapterOptions::default()
    };
    let adapter = instance_adapter(client.clone(), &projects, options);

    let items = adapter.list("*").await.unwrap();
    assert_eq!(items.len(), 16);
    assert!(client.max_concurrent() <= 2, "saw {} concurrent listings", client.max_concurrent());
    assert!(client.max_concurrent() >= 1);
}

#[tokio::test]
async fn test_wildcard_listing_fills_cache() {
    let client = Arc::new(
        MockClient::new().on_aggregated(&aggregated_path("alpha-project"), project_listing("alpha-project")),
    );
    let adapter = instance_adapter(client.clone(), &["alpha-project"], AdapterOptions::default());

    adapter.list("*").await.unwrap();
    let calls = client.calls();

    let item = adapter
        .get("alpha-project.us-central1-a", &["alpha-project-us-central1-a-1"])
        .await
        .unwrap();
    assert_eq!(item.unique_value(), Some("alpha-project-us-central1-a-1"));
    assert_eq!(client.calls(), calls);
}

#[tokio::test]
async fn test_cancel_mid_listing_keeps_emitted_items() {
    let projects = ["alpha-project", "beta-project", "gamma-project"];
    let mut client = MockClient::new().with_aggregated_delay(Duration::from_millis(200));
    for project in projects {
        client = client.on_aggregated(&aggregated_path(project), project_listing(project));
    }
    let client = Arc::new(client);
    let cancel = CancellationToken::new();
    let options = AdapterOptions {
        max_concurrency: 1,
        cancel: cancel.clone(),
        ..AdapterOptions::default()
    };
    let adapter = instance_adapter(client.clone(), &projects, options);

    let (sink, mut stream) = query_channel();
    let started = Instant::now();
    let produce = async {
        adapter.list_stream("*", &sink).await;
        drop(sink);
    };
    // Cancel as soon as the first item shows up
    let consume = async {
        let mut results = QueryResults::default();
        while let Some(event) = stream.next().await {
            match event {
                QueryEvent::Item(item) => {
                    results.items.push(item);
                    cancel.cancel();
                }
                QueryEvent::Error(error) => results.errors.push(error),
            }
        }
        results
    };
    let ((), results) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(produce, consume) })
        .await
        .expect("cancelled listing should finish");

    // A full run takes several seconds at this delay
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());

    assert!(!results.items.is_empty());
    assert!(results.items.len() < 12);
    for item in &results.items {
        assert_eq!(item.scope, Scope::zonal("alpha-project", "us-central1-a"));
        assert!(item.unique_value().is_some_and(|v| v.starts_with("alpha-project-")));
    }

    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].kind, ErrorKind::Other);
    assert!(results.errors[0].message.contains("cancelled"));

    // Later projects never started
    assert_eq!(client.requests().len(), 1);
}
