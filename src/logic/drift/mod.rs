//! Drift Comparator - reference vs production distribution audit
//!
//! Compares each monitored feature column of a production dataset with the
//! same column of the reference (training) dataset, independently per
//! column, and aggregates the per-feature verdicts into a [`DriftReport`].
//!
//! # Architecture
//! - `dataset.rs`: CSV loading, numeric column detection
//! - `stats.rs`: KS statistic / p-value, population stability index
//!
//! The comparator is stateless: every call builds a fresh report.

pub mod dataset;
pub mod stats;

use std::path::Path;

use thiserror::Error;

use crate::models::{DriftMethod, DriftReport, FeatureDriftStatus, FEATURE_ORDER};
pub use dataset::Dataset;

pub const REFERENCE: &str = "reference";
pub const PRODUCTION: &str = "production";

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Bad or incompatible drift input
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("cannot read {dataset} dataset at {path}: {source}")]
    Io {
        dataset: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {dataset} dataset at line {line}: {reason}")]
    Parse {
        dataset: String,
        line: usize,
        reason: String,
    },

    #[error("{dataset} dataset has no rows")]
    EmptyDataset { dataset: String },

    #[error("no shared numeric columns between reference and production datasets")]
    NoSharedColumns,

    #[error("column '{column}' is missing or non-numeric in {dataset} dataset")]
    ColumnMismatch { dataset: String, column: String },

    #[error("threshold must be a finite non-negative number, got {0}")]
    InvalidThreshold(f64),
}

// ============================================================================
// FEATURE SELECTION
// ============================================================================

/// Which columns an audit covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSelection {
    /// Exactly these columns; each must be numeric on both sides
    Named(Vec<String>),
    /// Every numeric column the two datasets share, in reference order
    AllShared,
}

impl Default for FeatureSelection {
    /// The model's input features
    fn default() -> Self {
        FeatureSelection::Named(FEATURE_ORDER.iter().map(|s| s.to_string()).collect())
    }
}

impl FeatureSelection {
    /// Parse the `DRIFT_FEATURES` setting: `*` or a comma list
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == "*" {
            return FeatureSelection::AllShared;
        }
        FeatureSelection::Named(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

// ============================================================================
// DRIFT COMPARATOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct DriftComparator {
    method: DriftMethod,
    selection: FeatureSelection,
}

impl DriftComparator {
    pub fn new(method: DriftMethod, selection: FeatureSelection) -> Self {
        Self { method, selection }
    }

    /// Load both CSV sources and compare them
    pub fn compare_files(
        &self,
        reference: impl AsRef<Path>,
        production: impl AsRef<Path>,
        threshold: f64,
    ) -> Result<DriftReport, DriftError> {
        check_threshold(threshold)?;
        let reference = Dataset::load_csv(REFERENCE, reference)?;
        let production = Dataset::load_csv(PRODUCTION, production)?;
        self.compare(&reference, &production, threshold)
    }

    /// Per-feature drift test; a feature drifts when its statistic exceeds `threshold`
    pub fn compare(
        &self,
        reference: &Dataset,
        production: &Dataset,
        threshold: f64,
    ) -> Result<DriftReport, DriftError> {
        check_threshold(threshold)?;
        for dataset in [reference, production] {
            if dataset.row_count() == 0 {
                return Err(DriftError::EmptyDataset {
                    dataset: dataset.label().to_string(),
                });
            }
        }

        let columns = self.select_columns(reference, production)?;
        if columns.is_empty() {
            return Err(DriftError::NoSharedColumns);
        }

        let features = columns
            .into_iter()
            .map(|(name, ref_values, prod_values)| {
                let status = self.test_feature(&name, ref_values, prod_values, threshold);
                tracing::debug!(
                    feature = %status.feature,
                    statistic = status.statistic,
                    drift = status.drift_detected,
                    "Feature drift computed"
                );
                status
            })
            .collect();

        Ok(DriftReport::new(self.method, threshold, features))
    }

    fn select_columns<'a>(
        &self,
        reference: &'a Dataset,
        production: &'a Dataset,
    ) -> Result<Vec<(String, &'a [f64], &'a [f64])>, DriftError> {
        match &self.selection {
            FeatureSelection::Named(names) => names
                .iter()
                .map(|name| -> Result<_, DriftError> {
                    let column = |dataset: &'a Dataset| {
                        dataset.numeric_column(name).ok_or_else(|| DriftError::ColumnMismatch {
                            dataset: dataset.label().to_string(),
                            column: name.clone(),
                        })
                    };
                    Ok((name.clone(), column(reference)?, column(production)?))
                })
                .collect(),
            FeatureSelection::AllShared => Ok(reference
                .numeric_column_names()
                .filter_map(|name| {
                    let ref_values = reference.numeric_column(name)?;
                    let prod_values = production.numeric_column(name)?;
                    Some((name.to_string(), ref_values, prod_values))
                })
                .collect()),
        }
    }

    fn test_feature(
        &self,
        name: &str,
        reference: &[f64],
        production: &[f64],
        threshold: f64,
    ) -> FeatureDriftStatus {
        let (statistic, p_value) = match self.method {
            DriftMethod::KolmogorovSmirnov => {
                let d = stats::ks_statistic(reference, production);
                (d, Some(stats::ks_p_value(d, reference.len(), production.len())))
            }
            DriftMethod::PopulationStability => {
                (stats::population_stability_index(reference, production), None)
            }
        };

        FeatureDriftStatus {
            feature: name.to_string(),
            statistic,
            p_value,
            drift_detected: statistic > threshold,
            threshold,
        }
    }
}

fn check_threshold(threshold: f64) -> Result<(), DriftError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(DriftError::InvalidThreshold(threshold));
    }
    Ok(())
}

impl Default for DriftComparator {
    fn default() -> Self {
        Self::new(DriftMethod::KolmogorovSmirnov, FeatureSelection::default())
    }
}
