//! Inference Engine - churn model integration
//!
//! Wraps the loaded classifier behind [`ModelHandle`] so the model can be
//! swapped without touching request handlers. A swap replaces the shared
//! `Arc` in one step; requests already holding a snapshot finish on the
//! model they started with.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;

use crate::logic::canonical::CanonicalForm;
use crate::models::{PredictionResult, FEATURE_COUNT, FEATURE_ORDER};

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Failure raised by a model implementation
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Failure of one inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("no model loaded")]
    ServiceUnavailable,

    #[error("feature '{0}' missing from canonical form")]
    MissingFeature(&'static str),

    #[error("model inference failed: {0}")]
    Model(#[from] ModelError),
}

/// Failure to read a model artifact
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("cannot read model {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse model {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model parameters: {0}")]
    Invalid(String),
}

// ============================================================================
// MODEL TRAIT
// ============================================================================

/// A trained binary classifier over the customer feature layout
pub trait ChurnModel: Send + Sync {
    /// Short identifier for logs and status
    fn name(&self) -> &str;

    /// Probability of the positive (churn) class
    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError>;
}

// ============================================================================
// LOGISTIC MODEL
// ============================================================================

/// Logistic regression exported from training as JSON.
///
/// ```json
/// { "weights": [..10..], "intercept": -1.2, "means": [..10..], "scales": [..10..] }
/// ```
/// `means`/`scales` are optional standardisation parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    pub weights: [f64; FEATURE_COUNT],
    pub intercept: f64,
    #[serde(default)]
    pub means: Option<[f64; FEATURE_COUNT]>,
    #[serde(default)]
    pub scales: Option<[f64; FEATURE_COUNT]>,
}

impl LogisticModel {
    /// Load and validate a model artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let raw = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: display.clone(),
            source,
        })?;
        let model: LogisticModel = serde_json::from_str(&raw).map_err(|source| ModelLoadError::Parse {
            path: display,
            source,
        })?;

        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelLoadError::Invalid("weights must be finite".to_string()));
        }
        if let Some(means) = &self.means {
            if means.iter().any(|m| !m.is_finite()) {
                return Err(ModelLoadError::Invalid("means must be finite".to_string()));
            }
        }
        if let Some(scales) = &self.scales {
            if let Some(i) = scales.iter().position(|s| !s.is_finite() || *s == 0.0) {
                return Err(ModelLoadError::Invalid(format!(
                    "scale for {} must be finite and non-zero",
                    FEATURE_ORDER[i]
                )));
            }
        }
        Ok(())
    }
}

impl ChurnModel for LogisticModel {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError> {
        let mut z = self.intercept;
        for i in 0..FEATURE_COUNT {
            let mut x = features[i];
            if let Some(means) = &self.means {
                x -= means[i];
            }
            if let Some(scales) = &self.scales {
                x /= scales[i];
            }
            z += self.weights[i] * x;
        }

        let probability = 1.0 / (1.0 + (-z).exp());
        if !probability.is_finite() {
            return Err(ModelError(format!("non-finite probability for logit {}", z)));
        }
        Ok(probability)
    }
}

/// Load the model artifact at `path`
pub fn load_model(path: impl AsRef<Path>) -> Result<Arc<dyn ChurnModel>, ModelLoadError> {
    let model = LogisticModel::load(&path)?;
    tracing::info!(model = model.name(), "Model loaded from {}", path.as_ref().display());
    Ok(Arc::new(model))
}

// ============================================================================
// MODEL HANDLE
// ============================================================================

/// Owned, swappable reference to the current model
pub struct ModelHandle {
    current: RwLock<Option<Arc<dyn ChurnModel>>>,
    generation: AtomicU64,
}

impl ModelHandle {
    /// Handle with no model (service reports unavailable)
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_model(model: Arc<dyn ChurnModel>) -> Self {
        Self {
            current: RwLock::new(Some(model)),
            generation: AtomicU64::new(1),
        }
    }

    /// Reference to the model at this instant
    pub fn snapshot(&self) -> Option<Arc<dyn ChurnModel>> {
        self.current.read().clone()
    }

    /// Replace the model, returning the new generation
    pub fn swap(&self, model: Arc<dyn ChurnModel>) -> u64 {
        let mut current = self.current.write();
        *current = Some(model);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Number of models installed so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

// ============================================================================
// INFERENCE ENGINE
// ============================================================================

/// Turns canonical feature sets into predictions
pub struct InferenceEngine {
    model: ModelHandle,
    inference_count: AtomicU64,
}

impl InferenceEngine {
    pub fn new(model: ModelHandle) -> Self {
        Self {
            model,
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Run the model on a canonical feature set
    pub fn predict(&self, canonical: &CanonicalForm) -> Result<PredictionResult, InferenceError> {
        let model = self.model.snapshot().ok_or(InferenceError::ServiceUnavailable)?;

        let mut vector = [0.0; FEATURE_COUNT];
        for (slot, name) in vector.iter_mut().zip(FEATURE_ORDER.iter()) {
            *slot = canonical.get(name).ok_or(InferenceError::MissingFeature(*name))?;
        }

        self.inference_count.fetch_add(1, Ordering::Relaxed);
        let probability = model.predict_proba(&vector)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ModelError(format!("probability {} outside [0, 1]", probability)).into());
        }

        Ok(PredictionResult::from_probability(probability))
    }

    /// Number of model invocations so far
    pub fn inference_count(&self) -> u64 {
        self.inference_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::canonical::{canonicalize, canonicalize_fields};
    use crate::logic::testing::FixedModel;
    use crate::models::features::sample_record;
    use crate::models::RiskLevel;

    struct FailingModel;

    impl ChurnModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict_proba(&self, _: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError> {
            Err(ModelError("matrix shape mismatch".to_string()))
        }
    }

    fn engine_with(model: impl ChurnModel + 'static) -> InferenceEngine {
        InferenceEngine::new(ModelHandle::with_model(Arc::new(model)))
    }

    #[test]
    fn test_no_model_is_unavailable() {
        let engine = InferenceEngine::new(ModelHandle::empty());
        let (_, form) = canonicalize(&sample_record());

        let err = engine.predict(&form).unwrap_err();
        assert!(matches!(err, InferenceError::ServiceUnavailable));
        assert_eq!(engine.inference_count(), 0);
    }

    #[test]
    fn test_missing_feature_checked_after_model() {
        let engine = engine_with(FixedModel(0.4));
        let (_, form) = canonicalize_fields(vec![("Age", 35.0)]);

        let err = engine.predict(&form).unwrap_err();
        assert!(matches!(err, InferenceError::MissingFeature("CreditScore")));
    }

    #[test]
    fn test_model_failure_carries_cause() {
        let engine = engine_with(FailingModel);
        let (_, form) = canonicalize(&sample_record());

        match engine.predict(&form) {
            Err(InferenceError::Model(cause)) => assert!(cause.0.contains("shape")),
            other => panic!("expected model error, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        let engine = engine_with(FixedModel(1.5));
        let (_, form) = canonicalize(&sample_record());
        assert!(matches!(engine.predict(&form), Err(InferenceError::Model(_))));
    }

    #[test]
    fn test_prediction_banding() {
        let engine = engine_with(FixedModel(0.7));
        let (_, form) = canonicalize(&sample_record());

        let result = engine.predict(&form).unwrap();
        assert_eq!(result.prediction, 1);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(engine.inference_count(), 1);
    }

    #[test]
    fn test_logistic_model_uses_layout_order() {
        let mut weights = [0.0; FEATURE_COUNT];
        weights[1] = 0.1; // Age
        let model = LogisticModel {
            weights,
            intercept: -3.5,
            means: None,
            scales: None,
        };

        // z = -3.5 + 0.1 * 35 = 0
        let p = model.predict_proba(&sample_record().to_vector()).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_model_standardisation() {
        let model = LogisticModel {
            weights: [1.0; FEATURE_COUNT],
            intercept: 0.0,
            means: Some(sample_record().to_vector()),
            scales: Some([2.0; FEATURE_COUNT]),
        };
        let p = model.predict_proba(&sample_record().to_vector()).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_load_rejects_zero_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let json = serde_json::json!({
            "weights": vec![0.0; FEATURE_COUNT],
            "intercept": 0.0,
            "scales": [1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        });
        std::fs::write(&path, json.to_string()).unwrap();

        match LogisticModel::load(&path) {
            Err(ModelLoadError::Invalid(msg)) => assert!(msg.contains("Tenure")),
            other => panic!("expected invalid model, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_model_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn_model.json");
        let json = serde_json::json!({ "weights": vec![0.0; FEATURE_COUNT], "intercept": 0.0 });
        std::fs::write(&path, json.to_string()).unwrap();

        let model = load_model(&path).unwrap();
        assert_eq!(model.name(), "logistic_regression");
        assert_eq!(model.predict_proba(&sample_record().to_vector()).unwrap(), 0.5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LogisticModel::load("/nonexistent/churn_model.json").unwrap_err();
        assert!(matches!(err, ModelLoadError::Io { .. }));
    }

    #[test]
    fn test_swap_is_visible_to_new_snapshots() {
        let handle = ModelHandle::with_model(Arc::new(FixedModel(0.1)));
        let before = handle.snapshot().unwrap();

        let generation = handle.swap(Arc::new(FixedModel(0.9)));
        assert_eq!(generation, 2);

        let features = sample_record().to_vector();
        assert_eq!(before.predict_proba(&features).unwrap(), 0.1);
        assert_eq!(handle.snapshot().unwrap().predict_proba(&features).unwrap(), 0.9);
    }
}
