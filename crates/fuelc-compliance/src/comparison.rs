//! Intensity comparison against a baseline route or vessel.

use serde::{Deserialize, Serialize};

use fuelc_core::{ComplianceYear, ValidationError};

use crate::schedule::TargetSchedule;

/// Outcome of comparing one intensity against a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityComparison {
    pub year: ComplianceYear,
    pub baseline_intensity: f64,
    pub comparison_intensity: f64,
    /// `(comparison / baseline − 1) × 100`. Zero when the baseline is zero.
    pub percent_diff: f64,
    pub target_intensity: f64,
    /// `comparison_intensity ≤ target_intensity`.
    pub compliant: bool,
}

/// Compare `comparison` against `baseline` and against the year's target.
pub fn compare_intensity(
    schedule: &TargetSchedule,
    year: ComplianceYear,
    baseline: f64,
    comparison: f64,
) -> Result<IntensityComparison, ValidationError> {
    for (field, value) in [("baseline_intensity", baseline), ("comparison_intensity", comparison)] {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteInput { field });
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeInput { field, value });
        }
    }
    let target_intensity = schedule.target_for(year)?;
    let percent_diff = if baseline == 0.0 {
        0.0
    } else {
        (comparison / baseline - 1.0) * 100.0
    };
    Ok(IntensityComparison {
        year,
        baseline_intensity: baseline,
        comparison_intensity: comparison,
        percent_diff,
        target_intensity,
        compliant: comparison <= target_intensity,
    })
}
