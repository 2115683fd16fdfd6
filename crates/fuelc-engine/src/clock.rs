//! # Compliance Clock
//!
//! Expiry and deposit-year rules depend on the current compliance year.
//! The engine never reads process time for that; it asks an injected
//! [`ComplianceClock`], so tests can pin or advance the year.

use std::sync::atomic::{AtomicU16, Ordering};

use fuelc_core::{ComplianceYear, Timestamp, ValidationError};

/// Source of the current compliance year and entry timestamps.
pub trait ComplianceClock: Send + Sync {
    /// The compliance year expiry is evaluated against.
    fn current_year(&self) -> Result<ComplianceYear, ValidationError>;

    /// Timestamp stamped on new entries and pools.
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// The UTC calendar year of the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ComplianceClock for SystemClock {
    fn current_year(&self) -> Result<ComplianceYear, ValidationError> {
        ComplianceYear::new(i64::from(Timestamp::now().year()))
    }
}

/// A pinned compliance year that can be moved explicitly.
#[derive(Debug)]
pub struct FixedClock {
    year: AtomicU16,
}

impl FixedClock {
    pub fn new(year: ComplianceYear) -> Self {
        Self {
            year: AtomicU16::new(year.value()),
        }
    }

    pub fn set_year(&self, year: ComplianceYear) {
        self.year.store(year.value(), Ordering::SeqCst);
    }
}

impl ComplianceClock for FixedClock {
    fn current_year(&self) -> Result<ComplianceYear, ValidationError> {
        ComplianceYear::new(i64::from(self.year.load(Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let clock = FixedClock::new(ComplianceYear::new(2025).unwrap());
        assert_eq!(clock.current_year().unwrap().value(), 2025);
        clock.set_year(ComplianceYear::new(2029).unwrap());
        assert_eq!(clock.current_year().unwrap().value(), 2029);
    }
}
