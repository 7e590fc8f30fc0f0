#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskboard_server::config::Config;
use taskboard_server::task::{JsonFileTaskRepository, TaskState};
use taskboard_server::web::create_app;
use tempfile::TempDir;
use tower::ServiceExt;

/// Test context owning the temporary data directory.
pub struct TestContext {
    pub dir: TempDir,
    pub data_file: PathBuf,
    pub app: Router,
}

pub fn setup() -> TestContext {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_file = dir.path().join("data").join("tasks.json");
    let app = create_test_app(&data_file, false);
    TestContext {
        dir,
        data_file,
        app,
    }
}

pub fn create_test_app(data_file: &Path, expose_error_details: bool) -> Router {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let config = Config {
        data_file: data_file.to_path_buf(),
        expose_error_details,
        ..Default::default()
    };
    let repository = Arc::new(JsonFileTaskRepository::new(data_file));
    let state = Arc::new(TaskState::new(repository, expose_error_details));
    create_app(&config, state).expect("Failed to create app")
}

/// Sends a request with an optional JSON body and returns the status and the
/// decoded JSON response body (`Null` when the body is empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Creates a task through the API and returns it.
pub async fn create_task(app: &Router, body: serde_json::Value) -> serde_json::Value {
    let (status, json) = send(app, Method::POST, "/api/tasks", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected response {}", json);
    json["task"].clone()
}

/// Lists tasks through the API with the given query string.
pub async fn list_tasks(app: &Router, query: &str) -> serde_json::Value {
    let uri = if query.is_empty() {
        "/api/tasks".to_string()
    } else {
        format!("/api/tasks?{}", query)
    };
    let (status, json) = send(app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    json
}

/// Returns the `field` value of every task in a list response.
pub fn field_of_tasks(listing: &serde_json::Value, field: &str) -> Vec<serde_json::Value> {
    listing["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task[field].clone())
        .collect()
}
