//! # Compliance Years
//!
//! [`ComplianceYear`] is a calendar year inside the regulation's active
//! window (2025..=2050). Construction outside the window fails with
//! [`ValidationError::UnsupportedYear`].

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A reporting year inside the regulation's active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub struct ComplianceYear(u16);

impl ComplianceYear {
    /// First year the regulation applies.
    pub const FIRST: u16 = 2025;
    /// Last year of the regulation's active window.
    pub const LAST: u16 = 2050;

    /// Validate a calendar year against the active window.
    pub fn new(year: i64) -> Result<Self, ValidationError> {
        if year < i64::from(Self::FIRST) || year > i64::from(Self::LAST) {
            return Err(ValidationError::UnsupportedYear {
                year,
                first: Self::FIRST,
                last: Self::LAST,
            });
        }
        Ok(Self(year as u16))
    }

    /// The calendar year.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Whole years elapsed from `earlier` to `self` (zero if `earlier` is later).
    pub fn years_since(self, earlier: ComplianceYear) -> u16 {
        self.0.saturating_sub(earlier.0)
    }
}

impl TryFrom<i64> for ComplianceYear {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ComplianceYear> for u16 {
    fn from(year: ComplianceYear) -> Self {
        year.0
    }
}

impl std::fmt::Display for ComplianceYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
