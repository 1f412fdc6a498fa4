//! JSON-RPC over HTTP-POST tests.

mod common;

use serde_json::{json, Value};

use common::TestFixture;
use mediaq_core::JobStatus;

async fn call(fixture: &TestFixture, method: &str, params: Value) -> Value {
    let response = fixture
        .post(
            "/rpc/http",
            json!({ "id": 1, "method": method, "params": params }),
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["id"], 1);
    response.body
}

// =============================================================================
// Job Method Tests
// =============================================================================

#[tokio::test]
async fn test_exec_then_progress() {
    let fixture = TestFixture::new().await;

    let body = call(
        &fixture,
        "Service.Exec",
        json!([{ "url": "https://example.com/v1", "params": [] }]),
    )
    .await;
    assert!(body["error"].is_null());
    let id = body["result"].as_str().unwrap().to_string();

    assert!(fixture.wait_for(&id, JobStatus::Completed).await);

    let body = call(&fixture, "Service.Progress", json!([{ "Id": id }])).await;
    assert_eq!(body["result"]["status"], "completed");

    let body = call(&fixture, "Service.Pending", json!([])).await;
    assert_eq!(body["result"], json!([id]));

    let body = call(&fixture, "Service.Running", json!([])).await;
    assert_eq!(body["result"][0]["id"], id.as_str());
}

#[tokio::test]
async fn test_kill_and_clear() {
    let fixture = TestFixture::new().await;
    fixture.downloader.hold_downloads().await;
    let id = fixture.submit("https://example.com/v1").await;
    assert!(fixture.wait_for(&id, JobStatus::Downloading).await);

    let body = call(&fixture, "Service.Kill", json!([id])).await;
    assert!(body["error"].is_null());

    let body = call(&fixture, "Service.Kill", json!([id])).await;
    assert!(body["error"].is_string());

    let body = call(&fixture, "Service.Clear", json!([id])).await;
    assert!(body["error"].is_null());

    let body = call(&fixture, "Service.Pending", json!([])).await;
    assert_eq!(body["result"], json!([]));
}

#[tokio::test]
async fn test_kill_all_reports_count() {
    let fixture = TestFixture::new().await;
    fixture.downloader.hold_downloads().await;
    let id = fixture.submit("https://example.com/v1").await;
    assert!(fixture.wait_for(&id, JobStatus::Downloading).await);

    let body = call(&fixture, "Service.KillAll", json!([])).await;
    assert_eq!(body["result"], 1);
}

#[tokio::test]
async fn test_formats_and_update() {
    let fixture = TestFixture::new().await;

    let body = call(
        &fixture,
        "Service.Formats",
        json!([{ "URL": "https://example.com/v1" }]),
    )
    .await;
    assert!(body["result"]["formats"].is_array());

    let body = call(&fixture, "Service.UpdateExecutable", json!([])).await;
    assert_eq!(body["result"], true);
}

#[tokio::test]
async fn test_livestream_methods_without_watchers() {
    let fixture = TestFixture::new().await;

    let body = call(&fixture, "Service.ProgressLivestream", json!([])).await;
    assert_eq!(body["result"], json!({}));

    let body = call(
        &fixture,
        "Service.KillLivestream",
        json!(["https://example.com/live"]),
    )
    .await;
    assert!(body["error"].is_string());

    let body = call(&fixture, "Service.KillAllLivestream", json!([])).await;
    assert!(body["error"].is_null());
}

// =============================================================================
// Protocol Error Tests
// =============================================================================

#[tokio::test]
async fn test_unknown_method() {
    let fixture = TestFixture::new().await;
    let body = call(&fixture, "Service.Nope", json!([])).await;

    assert!(body["result"].is_null());
    assert!(body["error"].as_str().unwrap().contains("Service.Nope"));
}

#[tokio::test]
async fn test_malformed_request_keeps_id() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_raw("/rpc/http", r#"{"id": 9, "params": []}"#).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["id"], 9);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_bad_params_are_reported() {
    let fixture = TestFixture::new().await;
    let body = call(&fixture, "Service.Exec", json!([42])).await;

    assert!(body["result"].is_null());
    assert!(body["error"].as_str().unwrap().contains("invalid params"));
}
