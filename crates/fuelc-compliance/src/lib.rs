//! # fuelc-compliance: Compliance Calculator
//!
//! Turns one ship-year of operational data into a [`ComplianceRecord`]:
//!
//! ```text
//! energy_in_scope = fuel_consumption × ENERGY_CONVERSION_FACTOR
//! cb              = round2((target_intensity − actual_intensity) × energy_in_scope)
//! ```
//!
//! - **Schedule** (`schedule.rs`): versioned table of target intensities by
//!   reporting period. Lookups never interpolate; a year with no covering
//!   period is `UnsupportedYear`.
//!
//! - **Calculator** (`calculator.rs`): the pure `compute` function. No state
//!   beyond the schedule and conversion factor, so recomputation after a data
//!   correction is always safe.
//!
//! - **Comparison** (`comparison.rs`): percentage difference of an intensity
//!   against a baseline and its compliance against the year's target.
//!
//! - **Routes** (`route.rs`): the route catalogue record, its filters, and
//!   the comparison of every route against a chosen baseline route.
//!
//! ## Crate Policy
//!
//! - Depends only on `fuelc-core`.
//! - Pure functions; no I/O, no locking.

pub mod calculator;
pub mod comparison;
pub mod route;
pub mod schedule;

pub use calculator::{CalculatorError, ComplianceCalculator, ComplianceRecord, RawShipYearMetrics};
pub use comparison::{compare_intensity, IntensityComparison};
pub use route::{compare_routes, FuelType, NewRoute, Route, RouteComparison, RouteFilter, VesselType};
pub use schedule::{TargetPeriod, TargetSchedule};
