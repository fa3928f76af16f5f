//! Test doubles for the model seam

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::inference::{ChurnModel, ModelError};
use crate::models::FEATURE_COUNT;

/// Always answers with the same probability
pub struct FixedModel(pub f64);

impl ChurnModel for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn predict_proba(&self, _: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError> {
        Ok(self.0)
    }
}

/// Deterministic model that records how often it ran
pub struct CountingModel {
    calls: Arc<AtomicU64>,
}

impl CountingModel {
    pub fn new() -> (Self, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        (Self { calls: calls.clone() }, calls)
    }
}

impl ChurnModel for CountingModel {
    fn name(&self) -> &str {
        "counting"
    }

    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Older customers churn more in this toy model
        Ok((features[1] / 100.0).clamp(0.0, 1.0))
    }
}
