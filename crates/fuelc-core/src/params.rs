//! # Regulatory Parameters
//!
//! Banking (Article 20) and pooling (Article 21) constants, plus the fuel
//! energy conversion factor. [`RegulatoryParams::default()`] returns the
//! regulation's values; tests and what-if tooling may construct others.

use serde::{Deserialize, Serialize};

/// Share of a positive compliance balance that may be banked, in basis points.
pub const MAX_BANK_FRACTION_BPS: u32 = 2_000;

/// Years after its source year during which a banked credit may be used.
pub const MAX_APPLY_YEARS: u16 = 3;

/// Minimum number of ships in a pool.
pub const MIN_POOL_SIZE: usize = 2;

/// Maximum number of ships in a pool.
pub const MAX_POOL_SIZE: usize = 100;

/// Energy content per tonne of fuel, in MJ.
pub const ENERGY_CONVERSION_FACTOR: f64 = 41_000.0;

/// Tunable regulatory constants consumed by the calculator, ledger and allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryParams {
    /// Bank cap as a fraction of a positive CB, in basis points (2000 = 20%).
    pub max_bank_fraction_bps: u32,
    /// A credit from year Y is usable through year `Y + max_apply_years`.
    pub max_apply_years: u16,
    /// Smallest legal pool.
    pub min_pool_size: usize,
    /// Largest legal pool.
    pub max_pool_size: usize,
    /// MJ per tonne of fuel.
    pub energy_conversion_factor: f64,
}

impl Default for RegulatoryParams {
    fn default() -> Self {
        Self {
            max_bank_fraction_bps: MAX_BANK_FRACTION_BPS,
            max_apply_years: MAX_APPLY_YEARS,
            min_pool_size: MIN_POOL_SIZE,
            max_pool_size: MAX_POOL_SIZE,
            energy_conversion_factor: ENERGY_CONVERSION_FACTOR,
        }
    }
}
