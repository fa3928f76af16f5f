//! ChurnWatch API Server
//!
//! Scores bank customers for churn risk and audits production data for
//! drift against the training data.
//!
//! # Request flow
//!
//! ```text
//! POST /predict  -> X-API-Key -> validate -> fingerprint -> cache -(miss)-> model
//! POST /drift/*  -> X-API-Key -> load reference + production CSV -> per-column test
//! ```

mod config;
mod models;
mod logic;
mod handlers;
mod middleware;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::{DriftComparator, InferenceEngine, ModelHandle, PredictionCache};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    init_tracing(config.json_logs || config.is_production());

    tracing::info!("ChurnWatch API starting...");

    // Load model; the service still starts without one and reports 503
    let model = match logic::inference::load_model(&config.model_path) {
        Ok(model) => ModelHandle::with_model(model),
        Err(e) => {
            tracing::error!("Model unavailable: {}", e);
            ModelHandle::empty()
        }
    };

    // Build application state
    let state = AppState::new(config.clone(), model);
    tracing::info!(
        "Prediction cache: capacity {}, invalidate on reload: {}",
        state.cache.capacity(),
        config.cache_invalidate_on_reload
    );

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "churnwatch_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub cache: Arc<PredictionCache>,
    pub drift: Arc<DriftComparator>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config, model: ModelHandle) -> Self {
        Self {
            engine: Arc::new(InferenceEngine::new(model)),
            cache: Arc::new(PredictionCache::new(config.cache_capacity)),
            drift: Arc::new(DriftComparator::new(
                config.drift_method,
                config.drift_features.clone(),
            )),
            config,
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(handlers::health::root));

    // API routes (X-API-Key required)
    let api_routes = Router::new()
        .route("/health", get(handlers::health::check))

        // Scoring
        .route("/predict", post(handlers::predict::predict))
        .route("/predict/batch", post(handlers::predict::predict_batch))
        .route("/cache/stats", get(handlers::predict::cache_stats))

        // Monitoring
        .route("/drift/check", post(handlers::drift::check))
        .route("/drift/report", post(handlers::drift::report))

        // Model lifecycle
        .route("/model/reload", post(handlers::model::reload))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_key
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
