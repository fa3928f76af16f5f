//! Customer feature record
//!
//! The 10-field schema the churn model was trained on. Incoming JSON is
//! converted into a [`FeatureRecord`] at the HTTP boundary; anything with
//! missing, extra or mistyped fields is rejected before it reaches the core.

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// FEATURE LAYOUT
// ============================================================================

/// Number of model inputs
pub const FEATURE_COUNT: usize = 10;

/// Feature names in the exact order the model consumes them
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "CreditScore",
    "Age",
    "Tenure",
    "Balance",
    "NumOfProducts",
    "HasCrCard",
    "IsActiveMember",
    "EstimatedSalary",
    "Geography_Germany",
    "Geography_Spain",
];

// ============================================================================
// FEATURE RECORD
// ============================================================================

/// One customer, as submitted to `/predict`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FeatureRecord {
    #[serde(rename = "CreditScore")]
    #[validate(range(min = 0.0))]
    pub credit_score: f64,

    #[serde(rename = "Age")]
    #[validate(range(min = 0.0))]
    pub age: f64,

    #[serde(rename = "Tenure")]
    #[validate(range(min = 0.0))]
    pub tenure: f64,

    #[serde(rename = "Balance")]
    pub balance: f64,

    #[serde(rename = "NumOfProducts")]
    #[validate(range(min = 0.0))]
    pub num_of_products: f64,

    #[serde(rename = "HasCrCard")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub has_cr_card: f64,

    #[serde(rename = "IsActiveMember")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub is_active_member: f64,

    #[serde(rename = "EstimatedSalary")]
    pub estimated_salary: f64,

    #[serde(rename = "Geography_Germany")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub geography_germany: f64,

    #[serde(rename = "Geography_Spain")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub geography_spain: f64,
}

impl FeatureRecord {
    /// Named values in model order
    pub fn named_values(&self) -> [(&'static str, f64); FEATURE_COUNT] {
        let values = self.to_vector();
        let mut out = [("", 0.0); FEATURE_COUNT];
        for (i, name) in FEATURE_ORDER.iter().enumerate() {
            out[i] = (*name, values[i]);
        }
        out
    }

    /// Values in model order
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.credit_score,
            self.age,
            self.tenure,
            self.balance,
            self.num_of_products,
            self.has_cr_card,
            self.is_active_member,
            self.estimated_salary,
            self.geography_germany,
            self.geography_spain,
        ]
    }

    /// Range checks plus a finiteness check (NaN/inf have no stable encoding)
    pub fn check(&self) -> Result<(), String> {
        if let Some((name, _)) = self.named_values().iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{} must be a finite number", name));
        }
        self.validate().map_err(|e| e.to_string())
    }
}

/// Batch of records for `/predict/batch`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchPredictRequest {
    pub records: Vec<FeatureRecord>,
}

/// Reference customer used across tests
#[cfg(test)]
pub(crate) fn sample_record() -> FeatureRecord {
    FeatureRecord {
        credit_score: 650.0,
        age: 35.0,
        tenure: 5.0,
        balance: 50000.0,
        num_of_products: 2.0,
        has_cr_card: 1.0,
        is_active_member: 1.0,
        estimated_salary: 75000.0,
        geography_germany: 0.0,
        geography_spain: 0.0,
    }
}
