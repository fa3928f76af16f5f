//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::logic::{DriftError, InferenceError};
use crate::logic::inference::ModelLoadError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    InvalidApiKey,

    // Model errors
    ServiceUnavailable,
    InferenceError(String),
    ModelLoadError(String),

    // Validation errors
    ValidationError(String),

    // Drift errors
    DriftError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidApiKey => (StatusCode::FORBIDDEN, "Invalid or missing API key"),
            AppError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Model not loaded"),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::InferenceError(msg) => {
                tracing::error!("Inference error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed")
            }
            AppError::ModelLoadError(msg) => {
                tracing::error!("Model load error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Model reload failed")
            }
            AppError::DriftError(msg) => {
                tracing::error!("Drift detection error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Drift detection failed")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ServiceUnavailable => AppError::ServiceUnavailable,
            other => AppError::InferenceError(other.to_string()),
        }
    }
}

impl From<DriftError> for AppError {
    fn from(err: DriftError) -> Self {
        match err {
            DriftError::InvalidThreshold(_) => AppError::ValidationError(err.to_string()),
            other => AppError::DriftError(other.to_string()),
        }
    }
}

impl From<ModelLoadError> for AppError {
    fn from(err: ModelLoadError) -> Self {
        AppError::ModelLoadError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("worker task failed: {}", err))
    }
}
