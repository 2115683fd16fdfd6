//! # Compliance Calculator
//!
//! Pure computation of a ship-year's Compliance Balance (CB).
//!
//! The float product `(target − actual) × energy` is rounded exactly once,
//! to two decimals, half away from zero. Identical inputs always produce a
//! bit-identical [`CbAmount`], so a record can be re-derived after a raw
//! data correction and compared against the stored one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fuelc_core::{CbAmount, ComplianceYear, ErrorClass, RegulatoryParams, ShipId, ValidationError};

use crate::schedule::TargetSchedule;

/// Operational data reported for one ship in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawShipYearMetrics {
    /// Reporting ship.
    pub ship_id: ShipId,
    /// Calendar year of the data. Validated against the schedule.
    pub year: i64,
    /// Achieved GHG intensity, gCO₂e/MJ.
    pub actual_intensity: f64,
    /// Fuel consumed, tonnes.
    pub fuel_consumption: f64,
}

/// The computed compliance position of a ship for one year.
///
/// `cb` is derived from the other fields; the record is keyed by
/// `(ship_id, year)` and a recompute replaces it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub ship_id: ShipId,
    pub year: ComplianceYear,
    /// gCO₂e/MJ.
    pub actual_intensity: f64,
    /// gCO₂e/MJ, from the schedule.
    pub target_intensity: f64,
    /// MJ. Always strictly positive.
    pub energy_in_scope: f64,
    /// Compliance balance, gCO₂e. Positive is surplus, negative is deficit.
    pub cb: CbAmount,
    /// Version label of the schedule the target came from.
    pub schedule_version: String,
}

impl ComplianceRecord {
    /// Positive CB.
    pub fn is_surplus(&self) -> bool {
        self.cb.is_positive()
    }

    /// Negative CB.
    pub fn is_deficit(&self) -> bool {
        self.cb.is_negative()
    }
}

/// Errors from the calculator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    /// Input failed validation (including unsupported years).
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Zero fuel means zero energy in scope; a record needs `energy_in_scope > 0`.
    #[error("energy in scope must be positive (fuel consumption {fuel_consumption} t)")]
    NoEnergyInScope {
        /// The reported fuel mass.
        fuel_consumption: f64,
    },
}

impl CalculatorError {
    /// Classify into the shared taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Invalid(err) => err.class(),
            Self::NoEnergyInScope { .. } => ErrorClass::Validation,
        }
    }
}

/// The Compliance Calculator: a target schedule plus the energy conversion factor.
#[derive(Debug, Clone)]
pub struct ComplianceCalculator {
    schedule: TargetSchedule,
    energy_conversion_factor: f64,
}

impl ComplianceCalculator {
    /// Build a calculator from a schedule and the regulatory parameters.
    pub fn new(schedule: TargetSchedule, params: &RegulatoryParams) -> Self {
        Self {
            schedule,
            energy_conversion_factor: params.energy_conversion_factor,
        }
    }

    /// The schedule this calculator looks targets up in.
    pub fn schedule(&self) -> &TargetSchedule {
        &self.schedule
    }

    /// Compute the compliance record for one ship-year.
    ///
    /// # Errors
    ///
    /// - `UnsupportedYear` if the year is outside the active window or not
    ///   covered by the schedule.
    /// - `NegativeInput` / `NonFiniteInput` for bad intensity or fuel values.
    /// - `NoEnergyInScope` when fuel consumption is zero.
    pub fn compute(&self, metrics: &RawShipYearMetrics) -> Result<ComplianceRecord, CalculatorError> {
        let year = ComplianceYear::new(metrics.year)?;
        require_non_negative("actual_intensity", metrics.actual_intensity)?;
        require_non_negative("fuel_consumption", metrics.fuel_consumption)?;

        let target_intensity = self.schedule.target_for(year)?;
        let energy_in_scope = metrics.fuel_consumption * self.energy_conversion_factor;
        if !(energy_in_scope > 0.0) || !energy_in_scope.is_finite() {
            return Err(CalculatorError::NoEnergyInScope {
                fuel_consumption: metrics.fuel_consumption,
            });
        }

        let cb = CbAmount::from_f64_rounded(
            (target_intensity - metrics.actual_intensity) * energy_in_scope,
        )?;

        tracing::debug!(
            ship_id = %metrics.ship_id,
            year = %year,
            target_intensity,
            actual_intensity = metrics.actual_intensity,
            cb = %cb,
            "computed compliance balance"
        );

        Ok(ComplianceRecord {
            ship_id: metrics.ship_id.clone(),
            year,
            actual_intensity: metrics.actual_intensity,
            target_intensity,
            energy_in_scope,
            cb,
            schedule_version: self.schedule.version().to_string(),
        })
    }
}

impl Default for ComplianceCalculator {
    fn default() -> Self {
        Self::new(TargetSchedule::default(), &RegulatoryParams::default())
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteInput { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeInput { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(year: i64, actual: f64, fuel: f64) -> RawShipYearMetrics {
        RawShipYearMetrics {
            ship_id: ShipId::new("IMO9321483").unwrap(),
            year,
            actual_intensity: actual,
            fuel_consumption: fuel,
        }
    }

    #[test]
    fn deficit_matches_hand_computation() {
        // target 89.3368, actual 91.0: (−1.6632) × 5000 t × 41 000 MJ/t
        let record = ComplianceCalculator::default()
            .compute(&metrics(2025, 91.0, 5_000.0))
            .unwrap();
        assert_eq!(record.energy_in_scope, 205_000_000.0);
        assert_eq!(record.target_intensity, 89.3368);
        assert_eq!(record.cb.to_string(), "-340956000.00");
        assert!(record.is_deficit());
        assert_eq!(record.schedule_version, "ANCHORS-V0");
    }

    #[test]
    fn surplus_matches_hand_computation() {
        let record = ComplianceCalculator::default()
            .compute(&metrics(2025, 88.0, 5_000.0))
            .unwrap();
        assert_eq!(record.cb.to_string(), "274044000.00");
        assert!(record.is_surplus());
    }

    #[test]
    fn target_equal_to_actual_is_zero() {
        let record = ComplianceCalculator::default()
            .compute(&metrics(2025, 89.3368, 100.0))
            .unwrap();
        assert!(record.cb.is_zero());
        assert!(!record.is_surplus() && !record.is_deficit());
    }

    #[test]
    fn years_outside_window_are_unsupported() {
        let calc = ComplianceCalculator::default();
        for y in [2024, 2051, -1] {
            let err = calc.compute(&metrics(y, 90.0, 1.0)).unwrap_err();
            assert_eq!(err.class(), ErrorClass::UnsupportedYear, "year {y}");
        }
    }

    #[test]
    fn anchor_schedule_gap_is_unsupported() {
        let calc = ComplianceCalculator::default();
        let record = calc.compute(&metrics(2030, 86.96, 1.0)).unwrap();
        assert_eq!(record.target_intensity, 87.96);
        assert_eq!(record.cb.to_string(), "41000.00");
        for gap in [2027, 2028] {
            let err = calc.compute(&metrics(gap, 90.0, 1.0)).unwrap_err();
            assert_eq!(err.class(), ErrorClass::UnsupportedYear, "year {gap}");
        }
    }

    #[test]
    fn fueleu_periods_are_opt_in() {
        let calc = ComplianceCalculator::new(TargetSchedule::fueleu_2023(), &RegulatoryParams::default());
        let record = calc.compute(&metrics(2027, 88.3368, 1.0)).unwrap();
        assert_eq!(record.cb.to_string(), "41000.00");
        assert_eq!(record.schedule_version, "FUELEU-2023");
        assert_eq!(calc.compute(&metrics(2030, 90.0, 1.0)).unwrap().target_intensity, 85.6904);
    }

    #[test]
    fn rejects_negative_and_non_finite_inputs() {
        let calc = ComplianceCalculator::default();
        assert!(matches!(
            calc.compute(&metrics(2025, -0.1, 1.0)),
            Err(CalculatorError::Invalid(ValidationError::NegativeInput { field: "actual_intensity", .. }))
        ));
        assert!(matches!(
            calc.compute(&metrics(2025, 90.0, -5.0)),
            Err(CalculatorError::Invalid(ValidationError::NegativeInput { field: "fuel_consumption", .. }))
        ));
        assert!(matches!(
            calc.compute(&metrics(2025, f64::NAN, 1.0)),
            Err(CalculatorError::Invalid(ValidationError::NonFiniteInput { .. }))
        ));
    }

    #[test]
    fn zero_fuel_has_no_energy_in_scope() {
        let err = ComplianceCalculator::default()
            .compute(&metrics(2025, 90.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, CalculatorError::NoEnergyInScope { .. }));
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn zero_intensity_is_allowed() {
        let record = ComplianceCalculator::new(TargetSchedule::fueleu_2023(), &RegulatoryParams::default())
            .compute(&metrics(2050, 0.0, 1.0))
            .unwrap();
        // 18.232 × 41 000
        assert_eq!(record.cb.to_string(), "747512.00");
    }

    #[test]
    fn record_serializes_cb_as_string() {
        let record = ComplianceCalculator::default()
            .compute(&metrics(2025, 91.0, 5_000.0))
            .unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["cb"], "-340956000.00");
        assert_eq!(json["year"], 2025);
    }
}
