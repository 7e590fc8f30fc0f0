use crate::task::service::{TaskService, TaskServiceError};
use crate::task::store::TaskRepository;
use crate::web::api::ApiError;
use std::sync::Arc;

pub mod v1;

/// Shared state of the task routes.
pub struct TaskState {
    pub service: TaskService,
    /// Whether internal error responses include the underlying error message.
    pub expose_error_details: bool,
}

impl TaskState {
    pub fn new(repository: Arc<dyn TaskRepository>, expose_error_details: bool) -> Self {
        Self {
            service: TaskService::new(repository),
            expose_error_details,
        }
    }

    /// Maps a service error to the response sent to the client.
    pub fn api_error(&self, err: TaskServiceError) -> ApiError {
        match err {
            TaskServiceError::Validation(errors) => ApiError::Validation(errors),
            TaskServiceError::TaskNotFound(_) => ApiError::NotFound("Task not found".to_string()),
            TaskServiceError::InvalidBulkRequest(message) => ApiError::BadBulkRequest(message),
            TaskServiceError::Storage(err) => {
                tracing::error!("Task storage failure: {}", err);
                let message = if self.expose_error_details {
                    err.to_string()
                } else {
                    "Something went wrong".to_string()
                };
                ApiError::Internal { message }
            }
        }
    }
}
