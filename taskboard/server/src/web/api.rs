use crate::task::TaskState;
use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON response for API errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }
}

/// JSON response listing every violated field rule.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationErrorResponse {
    pub errors: Vec<String>,
}

/// Custom error type for JSON API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request payload broke one or more field rules.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    /// The referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The request body could not be understood.
    #[error("{0}")]
    MalformedRequest(String),
    /// A bulk request was missing its action or IDs, or named an unknown action.
    #[error("{0}")]
    BadBulkRequest(String),
    /// Anything the client cannot fix.
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationErrorResponse { errors }),
            )
                .into_response(),
            ApiError::NotFound(error) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(error))).into_response()
            }
            ApiError::MalformedRequest(error) | ApiError::BadBulkRequest(error) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error))).into_response()
            }
            ApiError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                    message: Some(message),
                }),
            )
                .into_response(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonSyntaxError(_) => "Invalid JSON in request body".to_string(),
            other => other.body_text(),
        };
        ApiError::MalformedRequest(message)
    }
}

/// JSON body extractor that reports unreadable bodies as [`ApiError`]s.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(task_state: Arc<TaskState>) -> Router {
    let task_routes = crate::task::api::v1::create_api_router(task_state);
    let api_routes = Router::new()
        .route("/health", get(super::health_check_handler))
        .merge(task_routes);
    Router::new().nest("/api", api_routes)
}
