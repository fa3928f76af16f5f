//! Configuration module

use std::env;

use crate::logic::cache::DEFAULT_CACHE_CAPACITY;
use crate::logic::FeatureSelection;
use crate::models::DriftMethod;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Expected `X-API-Key` value
    pub api_key: String,

    /// Model artifact path
    pub model_path: String,

    /// Training-time dataset for drift audits
    pub reference_data_path: String,

    /// Recent production dataset for drift audits
    pub production_data_path: String,

    /// Prediction cache capacity (entries)
    pub cache_capacity: usize,

    /// Clear the prediction cache when the model is swapped
    pub cache_invalidate_on_reload: bool,

    /// Threshold used when `/drift/*` is called without one
    pub drift_threshold: f64,

    /// Per-feature divergence statistic
    pub drift_method: DriftMethod,

    /// Columns covered by drift audits
    pub drift_features: FeatureSelection,

    /// Emit JSON log lines
    pub json_logs: bool,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            api_key: env::var("API_KEY")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| "model/churn_model.json".to_string()),

            reference_data_path: env::var("REFERENCE_DATA_PATH")
                .unwrap_or_else(|_| "data/bank_churn.csv".to_string()),

            production_data_path: env::var("PRODUCTION_DATA_PATH")
                .unwrap_or_else(|_| "data/production_data.csv".to_string()),

            cache_capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(DEFAULT_CACHE_CAPACITY),

            cache_invalidate_on_reload: env::var("CACHE_INVALIDATE_ON_RELOAD")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),

            drift_threshold: env::var("DRIFT_THRESHOLD")
                .ok()
                .and_then(|t| t.parse().ok())
                .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                .unwrap_or(0.05),

            drift_method: env::var("DRIFT_METHOD")
                .ok()
                .and_then(|m| DriftMethod::parse(&m))
                .unwrap_or(DriftMethod::KolmogorovSmirnov),

            drift_features: env::var("DRIFT_FEATURES")
                .ok()
                .filter(|f| !f.trim().is_empty())
                .map(|f| FeatureSelection::parse(&f))
                .unwrap_or_default(),

            json_logs: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            api_key: "test-key".to_string(),
            model_path: "model/churn_model.json".to_string(),
            reference_data_path: "data/bank_churn.csv".to_string(),
            production_data_path: "data/production_data.csv".to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_invalidate_on_reload: true,
            drift_threshold: 0.05,
            drift_method: DriftMethod::KolmogorovSmirnov,
            drift_features: FeatureSelection::default(),
            json_logs: false,
            environment: "test".to_string(),
        }
    }
}
