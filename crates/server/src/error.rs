use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use deployment::DeploymentError;
use services::services::{
    config::ConfigError, database_validator::DatabaseValidationError,
    file_storage::StorageError, notification::NotificationError, seed::SeedError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Path(#[from] PathRejection),
    #[error(transparent)]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// A write referenced a row that no longer exists, e.g. a project deleted
    /// between the existence check and the insert.
    fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            ApiError::Database(sqlx::Error::Database(err)) if err.is_foreign_key_violation()
        )
    }

    fn status_code(&self) -> StatusCode {
        if self.is_foreign_key_violation() {
            return StatusCode::BAD_REQUEST;
        }
        match self {
            ApiError::Storage(err) => storage_status(err),
            ApiError::Config(err) => config_status(err),
            ApiError::Deployment(DeploymentError::Config(err)) => config_status(err),
            ApiError::Deployment(DeploymentError::Storage(err)) => storage_status(err),
            ApiError::Notification(NotificationError::TaskNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Notification(NotificationError::NoDueDate(_)) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(err) => err.status(),
            ApiError::Path(err) => err.status(),
            ApiError::Query(err) => err.status(),
            ApiError::Json(err) => err.status(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_)
            | ApiError::Notification(NotificationError::Database(_))
            | ApiError::Seed(_)
            | ApiError::DatabaseValidation(_)
            | ApiError::Deployment(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::UnknownCategory(_)
        | StorageError::UnsupportedType { .. }
        | StorageError::TooLarge { .. }
        | StorageError::Empty => StatusCode::BAD_REQUEST,
        StorageError::InvalidKey(_) => StatusCode::FORBIDDEN,
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn config_status(err: &ConfigError) -> StatusCode {
    match err {
        ConfigError::ValidationError(_) | ConfigError::Json(_) => StatusCode::BAD_REQUEST,
        ConfigError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_message = if self.is_foreign_key_violation() {
            "Referenced record does not exist".to_string()
        } else if status_code.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            match &self {
                ApiError::Database(_) | ApiError::Notification(_) | ApiError::Seed(_) => {
                    "Database error occurred".to_string()
                }
                _ => self.to_string(),
            }
        } else {
            self.to_string()
        };

        let response = ApiResponse::<()>::error(&error_message);
        (status_code, ResponseJson(response)).into_response()
    }
}
