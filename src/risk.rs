//! Screening risk classification.

use crate::models::RiskLevel;

/// Classify a screening observation from its glucose reading and BMI.
///
/// Rules are evaluated top to bottom, first match wins. The thresholds are
/// shared with the prediction service and the frontend; do not adjust them
/// independently.
pub fn classify(glucose: i64, bmi: f64) -> RiskLevel {
    if glucose > 160 || bmi > 35.0 {
        RiskLevel::High
    } else if glucose > 120 || bmi > 30.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
