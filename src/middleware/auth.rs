//! Authentication middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
};
use sha2::{Sha256, Digest};

use crate::{AppState, AppError};

/// Header carrying the caller credential
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Middleware: Require a valid `X-API-Key` header
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req.headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    if !keys_match(provided, &state.config.api_key) {
        tracing::warn!("Rejected request to {} with invalid API key", req.uri().path());
        return Err(AppError::InvalidApiKey);
    }

    Ok(next.run(req).await)
}

/// Compare digests so the check does not short-circuit on the first differing byte
fn keys_match(provided: &str, expected: &str) -> bool {
    let a = hash_key(provided);
    let b = hash_key(expected);
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn hash_key(key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}
