//! Core scoring and drift logic
//!
//! Prediction path: canonicalize -> cache lookup -> inference on miss ->
//! cache insert. Drift audits are independent of it.

pub mod canonical;
pub mod cache;
pub mod inference;
pub mod drift;
#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheStats, CacheStatus, PredictionCache};
pub use canonical::{canonicalize, Fingerprint};
pub use drift::{DriftComparator, DriftError, FeatureSelection};
pub use inference::{InferenceEngine, InferenceError, ModelHandle};

use crate::models::{FeatureRecord, PredictionResult};

/// A served prediction with its cache key
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub fingerprint: Fingerprint,
    pub result: PredictionResult,
    pub cache: CacheStatus,
}

/// Score one validated record through the cache
pub fn score(
    engine: &InferenceEngine,
    cache: &PredictionCache,
    record: &FeatureRecord,
) -> Result<Scored, InferenceError> {
    if !engine.model().is_loaded() {
        return Err(InferenceError::ServiceUnavailable);
    }

    let (fingerprint, canonical) = canonicalize(record);
    let (result, status) =
        cache.get_or_compute_with_status(fingerprint, &canonical, |form| engine.predict(form))?;

    Ok(Scored {
        fingerprint,
        result,
        cache: status,
    })
}
