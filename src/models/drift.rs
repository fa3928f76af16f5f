//! Drift audit models

use serde::{Deserialize, Serialize};

/// Dataset-level drift tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriftRiskLevel {
    Low,
    Medium,
    High,
}

impl DriftRiskLevel {
    /// `> 50` High, `(20, 50]` Medium, otherwise Low
    pub fn from_percentage(drift_percentage: f64) -> Self {
        if drift_percentage > 50.0 {
            DriftRiskLevel::High
        } else if drift_percentage > 20.0 {
            DriftRiskLevel::Medium
        } else {
            DriftRiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriftRiskLevel::Low => "LOW",
            DriftRiskLevel::Medium => "MEDIUM",
            DriftRiskLevel::High => "HIGH",
        }
    }
}

/// Per-column divergence statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMethod {
    /// Two-sample Kolmogorov-Smirnov D statistic
    KolmogorovSmirnov,
    /// Population stability index over reference quantile bins
    PopulationStability,
}

impl DriftMethod {
    /// Parse the `DRIFT_METHOD` setting
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ks" | "kolmogorov_smirnov" => Some(DriftMethod::KolmogorovSmirnov),
            "psi" | "population_stability" => Some(DriftMethod::PopulationStability),
            _ => None,
        }
    }
}

/// Drift status of one feature column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDriftStatus {
    pub feature: String,
    pub statistic: f64,
    /// Asymptotic p-value, only reported for the KS statistic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    pub drift_detected: bool,
    pub threshold: f64,
}

/// Result of one drift audit. Built fresh per call, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub method: DriftMethod,
    pub threshold: f64,
    /// In dataset column order
    pub features: Vec<FeatureDriftStatus>,
    pub features_analyzed: usize,
    pub features_drifted: usize,
    pub drift_percentage: f64,
    pub risk_level: DriftRiskLevel,
}

impl DriftReport {
    /// Aggregate per-feature statuses. Callers guarantee `features` is non-empty.
    pub fn new(method: DriftMethod, threshold: f64, features: Vec<FeatureDriftStatus>) -> Self {
        let features_analyzed = features.len();
        let features_drifted = features.iter().filter(|f| f.drift_detected).count();
        let drift_percentage = if features_analyzed == 0 {
            0.0
        } else {
            features_drifted as f64 / features_analyzed as f64 * 100.0
        };

        Self {
            method,
            threshold,
            features,
            features_analyzed,
            features_drifted,
            drift_percentage,
            risk_level: DriftRiskLevel::from_percentage(drift_percentage),
        }
    }

    /// Status for a named feature
    pub fn get(&self, feature: &str) -> Option<&FeatureDriftStatus> {
        self.features.iter().find(|f| f.feature == feature)
    }

    /// Names of drifted features, in column order
    pub fn drifted_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.drift_detected)
            .map(|f| f.feature.as_str())
            .collect()
    }
}

/// `threshold` query parameter of the drift endpoints
#[derive(Debug, Deserialize)]
pub struct DriftQuery {
    pub threshold: Option<f64>,
}

/// `/drift/check` response
#[derive(Debug, Serialize)]
pub struct DriftCheckResponse {
    pub status: &'static str,
    pub features_analyzed: usize,
    pub features_drifted: usize,
}

impl From<&DriftReport> for DriftCheckResponse {
    fn from(report: &DriftReport) -> Self {
        Self {
            status: "success",
            features_analyzed: report.features_analyzed,
            features_drifted: report.features_drifted,
        }
    }
}
