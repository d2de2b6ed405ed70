//! Integration tests for the GCP client using wiremock
//!
//! These tests verify the live client against mocked endpoints: auth
//! headers, status classification, pagination and aggregated listing.

use gcp_graph::adapter::{Adapter, AdapterOptions, ResourceAdapter};
use gcp_graph::cache::ResultCache;
use gcp_graph::error::{ErrorKind, ProviderError, QueryError};
use gcp_graph::gcp::auth::GcpCredentials;
use gcp_graph::gcp::client::GcpClient;
use gcp_graph::resource::definitions::{compute, kms};
use gcp_graph::resource::fetcher::{ApiRequest, ResourceClient};
use gcp_graph::resource::Service;
use gcp_graph::scope::Scope;
use async_trait::async_trait;
use gcp_auth::{Token, TokenProvider};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GcpClient {
    GcpClient::with_credentials(GcpCredentials::fixed("test-token"))
        .and_then(|c| c.with_base_url(Service::Compute, &format!("{}/compute/v1", server.uri())))
        .and_then(|c| c.with_base_url(Service::CloudKms, &format!("{}/kms/v1", server.uri())))
        .expect("client should build")
}

mod http_client_tests {
    use super::*;

    /// Test successful GET request returns parsed JSON
    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/global/networks/default"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "default",
                "autoCreateSubnetworks": true
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ApiRequest::new(Service::Compute, "projects/test-project/global/networks/default");
        let response = client.get(&request).await.expect("Request should succeed");

        assert_eq!(response["name"], "default");
    }

    /// Error bodies are classified by status, keeping the API message
    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;

        for (code, resource) in [(401, "expired"), (403, "restricted"), (404, "missing"), (429, "busy")] {
            Mock::given(method("GET"))
                .and(path(format!("/compute/v1/projects/p/global/networks/{}", resource)))
                .respond_with(ResponseTemplate::new(code).set_body_json(json!({
                    "error": {"code": code, "message": format!("{} failed", resource)}
                })))
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        let fetch = |resource: &str| {
            let request = ApiRequest::new(Service::Compute, format!("projects/p/global/networks/{}", resource));
            let client = client.clone();
            async move { client.get(&request).await.unwrap_err() }
        };

        let err = fetch("missing").await;
        assert_eq!(err, ProviderError::status(404, "missing failed"));
        assert_eq!(QueryError::from_provider(&err).kind, ErrorKind::NotFound);
        assert_eq!(QueryError::from_provider(&fetch("expired").await).kind, ErrorKind::PermissionDenied);
        assert_eq!(QueryError::from_provider(&fetch("restricted").await).kind, ErrorKind::PermissionDenied);
        assert_eq!(QueryError::from_provider(&fetch("busy").await).kind, ErrorKind::Other);
    }

    /// A body that isn't JSON is a decode failure
    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/p/global/images/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ApiRequest::new(Service::Compute, "projects/p/global/images/broken");
        let err = client.get(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    /// Test pagination with nextPageToken
    #[tokio::test]
    async fn test_pagination_with_next_page_token() {
        let server = MockServer::start().await;

        // Second page, matched on the token
        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones/us-central1-a/instances"))
            .and(query_param("pageToken", "token-page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "instance-3"}]
            })))
            .mount(&server)
            .await;

        // First page
        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones/us-central1-a/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "instance-1"}, {"name": "instance-2"}],
                "nextPageToken": "token-page-2"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ApiRequest::new(Service::Compute, "projects/test-project/zones/us-central1-a/instances");
        let mut pager = client.list(request);

        let mut names = Vec::new();
        while let Some(result) = pager.next().await {
            names.push(result.expect("page should load")["name"].as_str().unwrap().to_string());
        }
        assert_eq!(names, vec!["instance-1", "instance-2", "instance-3"]);
    }

    /// Aggregated list splits entries by scope key and asks for partial success
    #[tokio::test]
    async fn test_aggregated_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/aggregated/disks"))
            .and(query_param("returnPartialSuccess", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": {
                    "zones/us-central1-a": {"disks": [{"name": "d1"}]},
                    "zones/us-central1-b": {"warning": {"code": "NO_RESULTS_ON_PAGE"}},
                    "regions/us-central1": {"disks": [{"name": "d2"}]}
                },
                "unreachables": ["zones/asia-east1-a"]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ApiRequest::new(Service::Compute, "projects/test-project/aggregated/disks")
            .with_query("returnPartialSuccess", "true")
            .with_items_field("disks");
        let mut pager = client.aggregated_list(request);

        let mut keys = Vec::new();
        while let Some(entry) = pager.next().await {
            keys.push(entry.expect("page should load").0);
        }
        assert_eq!(keys, vec!["zones/us-central1-a", "regions/us-central1"]);
    }
}

mod token_refresh_tests {
    use super::*;

    /// Issues `token-1`, `token-2`, ... on successive requests
    #[derive(Default)]
    struct RotatingTokens {
        issued: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for RotatingTokens {
        async fn token(&self, _scopes: &[&str]) -> Result<Arc<Token>, gcp_auth::Error> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            let token: Token = serde_json::from_value(json!({
                "access_token": format!("token-{}", n),
                "expires_in": 3600
            }))
            .expect("token should deserialize");
            Ok(Arc::new(token))
        }

        async fn project_id(&self) -> Result<Arc<str>, gcp_auth::Error> {
            Ok(Arc::from("test-project"))
        }
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/global/networks/default"))
            .and(bearer_token("token-1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "token revoked"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/global/networks/default"))
            .and(bearer_token("token-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "default"})))
            .expect(2)
            .mount(&server)
            .await;

        let tokens = Arc::new(RotatingTokens::default());
        let client = GcpClient::with_credentials(GcpCredentials::from_provider(tokens.clone()))
            .and_then(|c| c.with_base_url(Service::Compute, &format!("{}/compute/v1", server.uri())))
            .unwrap();
        let request = ApiRequest::new(Service::Compute, "projects/test-project/global/networks/default");

        assert_eq!(client.get(&request).await.unwrap()["name"], "default");
        // The refreshed token stays cached
        assert_eq!(client.get(&request).await.unwrap()["name"], "default");
        assert_eq!(tokens.issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fixed_token_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/p/global/networks/default"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::new(Service::Compute, "projects/p/global/networks/default");
        let err = client_for(&server).get(&request).await.unwrap_err();
        assert_eq!(QueryError::from_provider(&err).kind, ErrorKind::PermissionDenied);
    }
}

mod adapter_over_http_tests {
    use super::*;

    #[tokio::test]
    async fn test_disk_get_end_to_end() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones/us-central1-a/disks/boot"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "boot",
                "sizeGb": "20",
                "users": ["https://www.googleapis.com/compute/v1/projects/test-project/zones/us-central1-a/instances/web-1"],
                "diskEncryptionKey": {
                    "kmsKeyName": "projects/sec-project/locations/global/keyRings/ring/cryptoKeys/disk-key/cryptoKeyVersions/2"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = ResourceAdapter::new(
            &compute::DISK,
            Arc::new(client_for(&server)),
            vec![Scope::zonal("test-project", "us-central1-a")],
            Arc::new(ResultCache::default()),
            AdapterOptions::default(),
        )
        .unwrap();

        let item = adapter.get("test-project.us-central1-a", &["boot"]).await.unwrap();
        assert_eq!(item.attributes["kmsKeyName"], json!("projects/sec-project/locations/global/keyRings/ring/cryptoKeys/disk-key/cryptoKeyVersions/2"));

        let user = item.linked_queries_to("compute-instance").next().unwrap();
        assert_eq!(user.query, "web-1");
        assert_eq!(user.scope.to_string(), "test-project.us-central1-a");

        let key = item.linked_queries_to("cloud-kms-crypto-key").next().unwrap();
        assert_eq!(key.query, "global|ring|disk-key");
        assert_eq!(key.scope, Scope::global("sec-project"));

        // Second get is answered from the cache; `expect(1)` checks on drop
        adapter.get("test-project.us-central1-a", &["boot"]).await.unwrap();
    }

    fn disk_adapter(server: &MockServer, cache: Arc<ResultCache>) -> ResourceAdapter {
        ResourceAdapter::new(
            &compute::DISK,
            Arc::new(client_for(server)),
            vec![Scope::zonal("test-project", "us-central1-a")],
            cache,
            AdapterOptions::default(),
        )
        .unwrap()
    }

    /// Dot segments would be resolved by URL joining and reach the parent resource
    #[tokio::test]
    async fn test_get_rejects_dot_segments() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "us-central1-a",
                "status": "UP"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let cache = Arc::new(ResultCache::default());
        let adapter = disk_adapter(&server, cache.clone());

        for part in ["..", "."] {
            let err = adapter.get("test-project.us-central1-a", &[part]).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Other);
        }
        assert!(cache.is_empty().await);
    }

    /// A response whose identity differs from the query is an error and is never cached
    #[tokio::test]
    async fn test_get_rejects_mismatched_identity() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones/us-central1-a/disks/alias"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "real-disk",
                "sizeGb": "10"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let cache = Arc::new(ResultCache::default());
        let adapter = disk_adapter(&server, cache.clone());

        for _ in 0..2 {
            let err = adapter.get("test-project.us-central1-a", &["alias"]).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Other);
        }
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_key_ring_get_encodes_parts() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/kms/v1/projects/test-project/locations/europe-west1/keyRings/my-ring"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/test-project/locations/europe-west1/keyRings/my-ring",
                "createTime": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let adapter = ResourceAdapter::new(
            &kms::KEY_RING,
            Arc::new(client_for(&server)),
            vec![Scope::global("test-project")],
            Arc::new(ResultCache::default()),
            AdapterOptions::default(),
        )
        .unwrap();

        let item = adapter.get("test-project", &["europe-west1", "my-ring"]).await.unwrap();
        assert_eq!(item.unique_value(), Some("europe-west1|my-ring"));
    }
}
