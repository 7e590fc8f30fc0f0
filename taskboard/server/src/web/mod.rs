use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::Json;
use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};

use crate::config::{self, Config};
use crate::task::{JsonFileTaskRepository, TaskState};
use api::{ErrorResponse, ValidationErrorResponse};

pub mod api;

/// OpenAPI description of the JSON API.
#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_handler,
        crate::task::api::v1::list_tasks_handler,
        crate::task::api::v1::get_task_handler,
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::delete_task_handler,
        crate::task::api::v1::bulk_tasks_handler,
        crate::task::api::v1::reorder_tasks_handler,
        crate::task::api::v1::stats_handler,
    ),
    components(schemas(ErrorResponse, ValidationErrorResponse, HealthResponse)),
    tags(
        (name = "Tasks", description = "Task management endpoints"),
        (name = "Health", description = "Service liveness")
    )
)]
pub struct ApiDoc;

/// Liveness report.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Builds the application router with tracing and CORS layers.
pub fn create_app(config: &Config, task_state: Arc<TaskState>) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .merge(api::create_api_router(task_state))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .fallback(route_not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );
    Ok(app)
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);
    tracing::info!("Task data file: {}", config.data_file.display());

    let repository = Arc::new(JsonFileTaskRepository::new(config.data_file.clone()));
    let task_state = Arc::new(TaskState::new(repository, config.expose_error_details));
    let app = create_app(&config, task_state)?;

    axum::serve(listener, app).await?;
    Ok(())
}

/// Handler for GET /api/health - Reports that the server is up.
#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Server is running", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for GET /api-docs/openapi.json - Serves the OpenAPI document.
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Handler for requests that match no route.
pub async fn route_not_found_handler() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Route not found")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_document_every_task_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/health",
            "/api/tasks",
            "/api/tasks/{id}",
            "/api/tasks/bulk",
            "/api/tasks/reorder",
            "/api/stats",
        ] {
            assert!(paths.contains(&expected), "missing path {}", expected);
        }
    }

    #[test]
    fn can_reject_invalid_cors_origin() {
        let config = Config {
            cors_origin: "not\na header".to_string(),
            ..Default::default()
        };
        let repository = Arc::new(JsonFileTaskRepository::new("unused.json"));
        let state = Arc::new(TaskState::new(repository, false));

        assert!(create_app(&config, state).is_err());
    }
}
