//! Prediction result model

use serde::{Deserialize, Serialize};

/// Probability above which a customer is predicted to churn (strict)
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Lower bound of the Medium band (inclusive)
pub const MEDIUM_RISK_FLOOR: f64 = 0.3;

/// Lower bound of the High band (inclusive)
pub const HIGH_RISK_FLOOR: f64 = 0.7;

/// Decimal places kept in `churn_probability`
const PROBABILITY_DECIMALS: i32 = 4;

/// Per-customer churn risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Left-closed bands: [0, 0.3) Low, [0.3, 0.7) Medium, [0.7, 1] High
    pub fn from_probability(probability: f64) -> Self {
        if probability < MEDIUM_RISK_FLOOR {
            RiskLevel::Low
        } else if probability < HIGH_RISK_FLOOR {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

/// Output of one inference, also the `/predict` response body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub churn_probability: f64,
    pub prediction: u8,
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Derive prediction and tier from the raw probability.
    ///
    /// The reported probability is rounded for display only; the decision
    /// and the band always use the unrounded value.
    pub fn from_probability(probability: f64) -> Self {
        let factor = 10f64.powi(PROBABILITY_DECIMALS);
        Self {
            churn_probability: (probability * factor).round() / factor,
            prediction: u8::from(probability > DECISION_THRESHOLD),
            risk_level: RiskLevel::from_probability(probability),
        }
    }
}

/// `/predict/batch` response
#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    pub predictions: Vec<PredictionResult>,
    pub count: usize,
}
