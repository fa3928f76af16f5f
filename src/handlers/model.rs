//! Model management handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppState, AppResult};
use crate::logic::inference::load_model;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub generation: u64,
    pub cache_cleared: bool,
}

/// Re-read the model artifact and swap it in.
///
/// On failure the current model stays in place.
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<ReloadResponse>> {
    let path = state.config.model_path.clone();
    let model = tokio::task::spawn_blocking(move || load_model(path)).await??;

    let generation = state.engine.model().swap(model);

    let cache_cleared = state.config.cache_invalidate_on_reload;
    if cache_cleared {
        state.cache.clear();
    }

    tracing::info!(generation, cache_cleared, "Model reloaded");

    Ok(Json(ReloadResponse {
        reloaded: true,
        generation,
        cache_cleared,
    }))
}
