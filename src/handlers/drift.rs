//! Drift audit handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use crate::{AppState, AppError, AppResult};
use crate::models::{DriftCheckResponse, DriftQuery, DriftReport};

/// Summary audit: counts only
pub async fn check(
    State(state): State<AppState>,
    query: Result<Query<DriftQuery>, QueryRejection>,
) -> AppResult<Json<DriftCheckResponse>> {
    let report = run_audit(&state, query).await?;
    Ok(Json(DriftCheckResponse::from(&report)))
}

/// Full audit: per-feature statistics and aggregate tier
pub async fn report(
    State(state): State<AppState>,
    query: Result<Query<DriftQuery>, QueryRejection>,
) -> AppResult<Json<DriftReport>> {
    let report = run_audit(&state, query).await?;
    Ok(Json(report))
}

async fn run_audit(
    state: &AppState,
    query: Result<Query<DriftQuery>, QueryRejection>,
) -> AppResult<DriftReport> {
    let Query(query) = query.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let threshold = query.threshold.unwrap_or(state.config.drift_threshold);

    let comparator = state.drift.clone();
    let reference = state.config.reference_data_path.clone();
    let production = state.config.production_data_path.clone();

    let report = tokio::task::spawn_blocking(move || {
        comparator.compare_files(&reference, &production, threshold)
    })
    .await??;

    tracing::info!(
        event_type = "drift_detection",
        features_analyzed = report.features_analyzed,
        features_drifted = report.features_drifted,
        drift_percentage = report.drift_percentage,
        risk_level = report.risk_level.as_str(),
        drifted = ?report.drifted_features(),
        "drift_detection"
    );

    Ok(report)
}
