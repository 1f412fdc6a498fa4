//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the router over a job
//! service backed by `MockDownloader`, so the REST and RPC surfaces can be
//! exercised without the real executable.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mediaq_core::{testing::MockDownloader, JobService, JobStatus};
use mediaq_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use mediaq_core::testing::fixtures;

/// Test fixture for in-process API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/downloads", json!({
///         "url": "https://example.com/v1"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock downloader - control downloads, metadata and listings
    pub downloader: MockDownloader,
    /// The service behind the router
    pub service: Arc<JobService>,
    /// Temporary directory for downloads and snapshots
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with a download ceiling of 2.
    pub async fn new() -> Self {
        Self::with_queue_size(2).await
    }

    pub async fn with_queue_size(queue_size: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloader = MockDownloader::new();
        let config = fixtures::config(temp_dir.path(), queue_size);

        let service = Arc::new(JobService::new(&config, Arc::new(downloader.clone())));
        service.start().await;

        let state = Arc::new(AppState::new(config, Arc::clone(&service)));
        let router = create_router(state);

        Self {
            router,
            downloader,
            service,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Submit a download and return its id.
    pub async fn submit(&self, url: &str) -> String {
        let response = self
            .post("/api/v1/downloads", serde_json::json!({ "url": url }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"]
            .as_str()
            .expect("id missing from response")
            .to_string()
    }

    pub async fn wait_for(&self, id: &str, status: JobStatus) -> bool {
        fixtures::wait_for_status(self.service.registry(), id, status, Duration::from_secs(5))
            .await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}
