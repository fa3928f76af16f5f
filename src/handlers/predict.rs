//! Prediction handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{AppState, AppError, AppResult};
use crate::logic::{self, CacheStats, Scored};
use crate::models::{BatchPredictRequest, BatchPredictResponse, FeatureRecord, PredictionResult};

/// Score one customer
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<FeatureRecord>, JsonRejection>,
) -> AppResult<Json<PredictionResult>> {
    let Json(record) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;
    record.check().map_err(AppError::ValidationError)?;

    let mut scored = score_records(&state, vec![record]).await?;
    let scored = scored.pop().ok_or_else(|| AppError::InternalError("empty scoring result".to_string()))?;

    Ok(Json(scored.result))
}

/// Score several customers; one invalid record rejects the batch
pub async fn predict_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> AppResult<Json<BatchPredictResponse>> {
    let Json(req) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;
    for (i, record) in req.records.iter().enumerate() {
        record
            .check()
            .map_err(|msg| AppError::ValidationError(format!("record {}: {}", i, msg)))?;
    }

    let scored = score_records(&state, req.records).await?;
    let predictions: Vec<PredictionResult> = scored.into_iter().map(|s| s.result).collect();

    tracing::info!("Batch scored: {} records", predictions.len());

    Ok(Json(BatchPredictResponse {
        count: predictions.len(),
        predictions,
    }))
}

/// Prediction cache counters
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Run records through the cache on the blocking pool.
///
/// Scoring may wait on another request computing the same fingerprint.
async fn score_records(state: &AppState, records: Vec<FeatureRecord>) -> AppResult<Vec<Scored>> {
    if !state.engine.model().is_loaded() {
        return Err(AppError::ServiceUnavailable);
    }

    let engine = state.engine.clone();
    let cache = state.cache.clone();

    let scored = tokio::task::spawn_blocking(move || {
        records
            .iter()
            .map(|record| logic::score(&engine, &cache, record))
            .collect::<Result<Vec<_>, _>>()
    })
    .await??;

    for s in &scored {
        tracing::info!(
            event_type = "prediction",
            features_hash = %s.fingerprint,
            probability = s.result.churn_probability,
            risk_level = s.result.risk_level.as_str(),
            cache = ?s.cache,
            "prediction"
        );
    }

    Ok(scored)
}
