use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use insta::assert_yaml_snapshot;
use tower::ServiceExt;

mod common;

use common::{send, setup};

#[tokio::test]
async fn can_report_health() {
    let context = setup();

    let (status, body) = send(&context.app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["version"], "1.0.0");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn can_answer_unknown_routes_with_json() {
    let context = setup();

    let (status, body) = send(&context.app, Method::GET, "/api/nothing-here", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_yaml_snapshot!(body, @"error: Route not found");
}

#[tokio::test]
async fn can_serve_openapi_document() {
    let context = setup();

    let (status, body) = send(&context.app, Method::GET, "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]["/api/tasks"].is_object());
    assert!(body["paths"]["/api/stats"]["get"].is_object());
}

#[tokio::test]
async fn can_allow_configured_cors_origin() {
    let context = setup();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/tasks")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = context.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn can_withhold_cors_headers_from_other_origins() {
    let context = setup();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();

    let response = context.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
