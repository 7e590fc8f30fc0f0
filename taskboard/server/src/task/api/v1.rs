use crate::task::api::TaskState;
use crate::task::service::{TaskQuery, TaskStats};
use crate::task::{Task, TaskInput};
use crate::web::api::{ApiError, ApiJson, ErrorResponse, ValidationErrorResponse};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// API response for listing tasks.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    /// Tasks matching the query
    tasks: Vec<Task>,
    /// Number of tasks in the collection
    total: usize,
    /// Number of tasks matching the query
    filtered: usize,
    timestamp: DateTime<Utc>,
}

/// API response carrying a single task that was just changed.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    message: String,
    task: Task,
}

impl TaskResponse {
    fn new(message: &str, task: Task) -> Self {
        Self {
            message: message.to_string(),
            task,
        }
    }
}

/// Request body for bulk operations.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    /// `complete`, `incomplete` or `delete`
    action: Option<String>,
    /// IDs of the tasks to change
    #[schema(value_type = Option<Vec<String>>)]
    task_ids: Option<serde_json::Value>,
}

/// API response for bulk operations.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    message: String,
    /// Number of tasks the action changed
    updated_count: usize,
    /// Number of tasks left in the collection
    total_tasks: usize,
}

/// Request body for reordering tasks.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    /// Task IDs in their new order
    #[schema(value_type = Option<Vec<String>>)]
    task_ids: Option<serde_json::Value>,
}

/// API response for reordering tasks.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderResponse {
    message: String,
    total_tasks: usize,
}

/// Reads a `taskIds` value. Anything but an array yields `None`; entries
/// that are not strings can match no task and are dropped.
fn id_list(value: Option<serde_json::Value>) -> Option<Vec<String>> {
    match value? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(id) => Some(id),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Handler for GET /api/tasks - Returns tasks matching the filters.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = TaskListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let listing = state
        .service
        .list_tasks(&query)
        .await
        .map_err(|err| state.api_error(err))?;

    Ok(Json(TaskListResponse {
        tasks: listing.tasks,
        total: listing.total,
        filtered: listing.filtered,
        timestamp: Utc::now(),
    }))
}

/// Handler for GET /api/tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = Task),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .service
        .get_task_by_id(&id)
        .await
        .map_err(|err| state.api_error(err))?;
    Ok(Json(task))
}

/// Handler for POST /api/tasks - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = TaskInput,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid task", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    ApiJson(input): ApiJson<TaskInput>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let task = state
        .service
        .create_task(input)
        .await
        .map_err(|err| state.api_error(err))?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::new("Task created successfully", task)),
    ))
}

/// Handler for PUT /api/tasks/{id} - Applies a partial update to a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    request_body = TaskInput,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid patch", body = ValidationErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskInput>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state
        .service
        .update_task(&id, patch)
        .await
        .map_err(|err| state.api_error(err))?;
    Ok(Json(TaskResponse::new("Task updated successfully", task)))
}

/// Handler for DELETE /api/tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = TaskResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state
        .service
        .delete_task(&id)
        .await
        .map_err(|err| state.api_error(err))?;
    Ok(Json(TaskResponse::new("Task deleted successfully", task)))
}

/// Handler for POST /api/tasks/bulk - Completes, reopens or deletes several tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/tasks/bulk",
    request_body = BulkRequest,
    responses(
        (status = 200, description = "Bulk operation applied", body = BulkResponse),
        (status = 400, description = "Invalid bulk request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn bulk_tasks_handler(
    State(state): State<Arc<TaskState>>,
    ApiJson(request): ApiJson<BulkRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let action = request.action.unwrap_or_default();
    let task_ids = id_list(request.task_ids).unwrap_or_default();
    let outcome = state
        .service
        .bulk_update(&action, &task_ids)
        .await
        .map_err(|err| state.api_error(err))?;

    Ok(Json(BulkResponse {
        message: format!("Bulk {} completed successfully", outcome.action.as_str()),
        updated_count: outcome.updated_count,
        total_tasks: outcome.total_tasks,
    }))
}

/// Handler for PUT /api/tasks/reorder - Stores a new task order.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/tasks/reorder",
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Tasks reordered", body = ReorderResponse),
        (status = 400, description = "Missing task IDs", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn reorder_tasks_handler(
    State(state): State<Arc<TaskState>>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> Result<Json<ReorderResponse>, ApiError> {
    let task_ids = id_list(request.task_ids)
        .ok_or_else(|| ApiError::MalformedRequest("taskIds must be an array".to_string()))?;
    let total_tasks = state
        .service
        .reorder_tasks(&task_ids)
        .await
        .map_err(|err| state.api_error(err))?;

    Ok(Json(ReorderResponse {
        message: "Tasks reordered successfully".to_string(),
        total_tasks,
    }))
}

/// Handler for GET /api/stats - Returns aggregate task counts.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Task statistics", body = TaskStats),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn stats_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<TaskStats>, ApiError> {
    let stats = state
        .service
        .stats()
        .await
        .map_err(|err| state.api_error(err))?;
    Ok(Json(stats))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/bulk", post(bulk_tasks_handler))
        .route("/tasks/reorder", put(reorder_tasks_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/stats", get(stats_handler))
        .with_state(state)
}
