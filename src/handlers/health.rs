//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppState, AppError, AppResult};

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
    version: &'static str,
    status: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    model_generation: u64,
    version: &'static str,
    timestamp: i64,
}

/// Service info
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Bank Churn Prediction API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// Healthy only while a model is loaded
pub async fn check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let model = state.engine.model();
    if !model.is_loaded() {
        return Err(AppError::ServiceUnavailable);
    }

    Ok(Json(HealthResponse {
        status: "healthy",
        model_loaded: true,
        model_generation: model.generation(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    }))
}
