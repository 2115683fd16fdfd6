//! # Target-Intensity Schedules
//!
//! A [`TargetSchedule`] maps compliance years to the regulatory target
//! GHG intensity (gCO₂e/MJ). It is a list of inclusive year ranges, each
//! with one target. The regulation defines targets per reduction period,
//! so a period table covers every year without interpolation.
//!
//! ## Versions
//!
//! | Version        | Periods                                                         |
//! |----------------|-----------------------------------------------------------------|
//! | `ANCHORS-V0`   | single-year anchors 2025, 2030, 2035 only (default)             |
//! | `FUELEU-2023`  | 2025-29 −2%, 2030-34 −6%, 2035-39 −14.5%, 2040-44 −31%, 2045-49 −62%, 2050 −80% vs 91.16 |
//!
//! Any year not covered by a period fails with
//! [`ValidationError::UnsupportedYear`]. Guessing a value between anchors
//! would produce a compliance balance with no legal basis.

use serde::{Deserialize, Serialize};

use fuelc_core::{ComplianceYear, ValidationError};

/// Reference GHG intensity (gCO₂e/MJ) the reduction percentages apply to.
pub const REFERENCE_INTENSITY: f64 = 91.16;

/// One reporting period with a fixed target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPeriod {
    /// First year of the period (inclusive).
    pub first_year: u16,
    /// Last year of the period (inclusive).
    pub last_year: u16,
    /// Target intensity in gCO₂e/MJ.
    pub target_intensity: f64,
}

impl TargetPeriod {
    /// A period covering `first_year..=last_year`.
    pub const fn new(first_year: u16, last_year: u16, target_intensity: f64) -> Self {
        Self {
            first_year,
            last_year,
            target_intensity,
        }
    }

    fn covers(&self, year: u16) -> bool {
        (self.first_year..=self.last_year).contains(&year)
    }
}

const FUELEU_2023: [TargetPeriod; 6] = [
    TargetPeriod::new(2025, 2029, 89.3368),
    TargetPeriod::new(2030, 2034, 85.6904),
    TargetPeriod::new(2035, 2039, 77.9418),
    TargetPeriod::new(2040, 2044, 62.9004),
    TargetPeriod::new(2045, 2049, 34.6408),
    TargetPeriod::new(2050, 2050, 18.232),
];

const ANCHORS_V0: [TargetPeriod; 3] = [
    TargetPeriod::new(2025, 2025, 89.3368),
    TargetPeriod::new(2030, 2030, 87.96),
    TargetPeriod::new(2035, 2035, 82.04),
];

/// A versioned, non-overlapping set of target periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSchedule {
    version: String,
    periods: Vec<TargetPeriod>,
}

impl TargetSchedule {
    /// The regulation's reduction periods.
    pub fn fueleu_2023() -> Self {
        Self {
            version: "FUELEU-2023".to_string(),
            periods: FUELEU_2023.to_vec(),
        }
    }

    /// Published anchors only. Years between anchors are unsupported.
    pub fn anchors_v0() -> Self {
        Self {
            version: "ANCHORS-V0".to_string(),
            periods: ANCHORS_V0.to_vec(),
        }
    }

    /// Look up a built-in schedule by its version label (case-insensitive).
    pub fn from_version(version: &str) -> Result<Self, ValidationError> {
        match version.trim().to_ascii_uppercase().as_str() {
            "ANCHORS-V0" => Ok(Self::anchors_v0()),
            "FUELEU-2023" => Ok(Self::fueleu_2023()),
            other => Err(ValidationError::InvalidSchedule(format!(
                "unknown schedule version {other:?}"
            ))),
        }
    }

    /// Build a custom schedule.
    ///
    /// Periods are sorted by first year. Rejects empty schedules, inverted or
    /// overlapping ranges, and non-positive or non-finite targets.
    pub fn new(
        version: impl Into<String>,
        mut periods: Vec<TargetPeriod>,
    ) -> Result<Self, ValidationError> {
        if periods.is_empty() {
            return Err(ValidationError::InvalidSchedule(
                "target schedule has no periods".to_string(),
            ));
        }
        periods.sort_by_key(|p| p.first_year);
        for p in &periods {
            if p.first_year > p.last_year {
                return Err(ValidationError::InvalidSchedule(format!(
                    "period {}..={} is inverted",
                    p.first_year, p.last_year
                )));
            }
            if !p.target_intensity.is_finite() || p.target_intensity <= 0.0 {
                return Err(ValidationError::InvalidSchedule(format!(
                    "period {}..={} has non-positive target {}",
                    p.first_year, p.last_year, p.target_intensity
                )));
            }
        }
        for pair in periods.windows(2) {
            if pair[1].first_year <= pair[0].last_year {
                return Err(ValidationError::InvalidSchedule(format!(
                    "periods starting {} and {} overlap",
                    pair[0].first_year, pair[1].first_year
                )));
            }
        }
        Ok(Self {
            version: version.into(),
            periods,
        })
    }

    /// Schedule version label, recorded on every computed record.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The periods, sorted by first year.
    pub fn periods(&self) -> &[TargetPeriod] {
        &self.periods
    }

    /// Target intensity for `year`.
    pub fn target_for(&self, year: ComplianceYear) -> Result<f64, ValidationError> {
        self.periods
            .iter()
            .find(|p| p.covers(year.value()))
            .map(|p| p.target_intensity)
            .ok_or_else(|| self.unsupported(i64::from(year.value())))
    }

    fn unsupported(&self, year: i64) -> ValidationError {
        let first = self.periods.first().map_or(ComplianceYear::FIRST, |p| p.first_year);
        let last = self.periods.last().map_or(ComplianceYear::LAST, |p| p.last_year);
        ValidationError::UnsupportedYear { year, first, last }
    }
}

impl Default for TargetSchedule {
    fn default() -> Self {
        Self::anchors_v0()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(y: i64) -> ComplianceYear {
        ComplianceYear::new(y).unwrap()
    }

    #[test]
    fn fueleu_periods_cover_whole_window() {
        let s = TargetSchedule::fueleu_2023();
        for y in ComplianceYear::FIRST..=ComplianceYear::LAST {
            assert!(s.target_for(year(i64::from(y))).is_ok(), "year {y} uncovered");
        }
        assert_eq!(s.target_for(year(2025)).unwrap(), 89.3368);
        assert_eq!(s.target_for(year(2029)).unwrap(), 89.3368);
        assert_eq!(s.target_for(year(2030)).unwrap(), 85.6904);
        assert_eq!(s.target_for(year(2050)).unwrap(), 18.232);
    }

    #[test]
    fn fueleu_targets_follow_reduction_percentages() {
        let s = TargetSchedule::fueleu_2023();
        let expected = [(2025, 0.02), (2030, 0.06), (2035, 0.145), (2040, 0.31), (2045, 0.62), (2050, 0.80)];
        for (y, reduction) in expected {
            let target = s.target_for(year(y)).unwrap();
            assert!((target - REFERENCE_INTENSITY * (1.0 - reduction)).abs() < 1e-9);
        }
    }

    #[test]
    fn anchors_do_not_interpolate() {
        let s = TargetSchedule::anchors_v0();
        assert_eq!(s.target_for(year(2030)).unwrap(), 87.96);
        let err = s.target_for(year(2027)).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedYear { year: 2027, first: 2025, last: 2035 }
        ));
    }

    #[test]
    fn default_is_anchor_only() {
        let s = TargetSchedule::default();
        assert_eq!(s.version(), "ANCHORS-V0");
        assert_eq!(s.target_for(year(2025)).unwrap(), 89.3368);
        assert_eq!(s.target_for(year(2030)).unwrap(), 87.96);
        assert_eq!(s.target_for(year(2035)).unwrap(), 82.04);
        for gap in [2026, 2027, 2029, 2031, 2036, 2050] {
            assert!(
                matches!(s.target_for(year(gap)), Err(ValidationError::UnsupportedYear { .. })),
                "year {gap} resolved"
            );
        }
    }

    #[test]
    fn built_in_versions_by_label() {
        assert_eq!(TargetSchedule::from_version("fueleu-2023").unwrap(), TargetSchedule::fueleu_2023());
        assert_eq!(TargetSchedule::from_version(" ANCHORS-V0 ").unwrap(), TargetSchedule::anchors_v0());
        assert!(TargetSchedule::from_version("FUELEU-2019").is_err());
    }

    #[test]
    fn custom_schedule_rejects_overlap_and_bad_targets() {
        let overlapping = vec![
            TargetPeriod::new(2025, 2030, 90.0),
            TargetPeriod::new(2030, 2031, 80.0),
        ];
        assert!(TargetSchedule::new("x", overlapping).is_err());
        assert!(TargetSchedule::new("x", vec![]).is_err());
        assert!(TargetSchedule::new("x", vec![TargetPeriod::new(2026, 2025, 90.0)]).is_err());
        assert!(TargetSchedule::new("x", vec![TargetPeriod::new(2025, 2025, -1.0)]).is_err());
        let ok = TargetSchedule::new(
            "custom",
            vec![TargetPeriod::new(2027, 2027, 80.0), TargetPeriod::new(2025, 2026, 90.0)],
        )
        .unwrap();
        assert_eq!(ok.periods()[0].first_year, 2025);
        assert_eq!(ok.version(), "custom");
    }
}
