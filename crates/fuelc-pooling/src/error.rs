//! Pooling error types.

use thiserror::Error;

use fuelc_core::{CbAmount, ErrorClass, ShipId, ValidationError};

/// Errors from pool validation and allocation. Any error means no pool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// Member balances whose sum does not fit the fixed-point range.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("pool has {size} members (allowed: {min}..={max})")]
    InvalidPoolSize { size: usize, min: usize, max: usize },

    #[error("ship {ship_id} appears more than once in the pool")]
    DuplicateMember { ship_id: ShipId },

    /// A net-deficit group cannot form a pool.
    #[error("pool compliance balances sum to {sum}; must be non-negative")]
    PoolSumNegative { sum: CbAmount },

    #[error("deficit ship {ship_id} would exit worse off ({cb_before} -> {cb_after})")]
    DeficitShipWorse {
        ship_id: ShipId,
        cb_before: CbAmount,
        cb_after: CbAmount,
    },

    #[error("surplus ship {ship_id} would exit negative ({cb_before} -> {cb_after})")]
    SurplusShipNegative {
        ship_id: ShipId,
        cb_before: CbAmount,
        cb_after: CbAmount,
    },

    #[error("allocation changed the pool total from {before} to {after}")]
    ConservationViolated { before: CbAmount, after: CbAmount },
}

impl PoolError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Invalid(e) => e.class(),
            Self::InvalidPoolSize { .. } | Self::DuplicateMember { .. } => ErrorClass::Validation,
            Self::PoolSumNegative { .. }
            | Self::DeficitShipWorse { .. }
            | Self::SurplusShipNegative { .. } => ErrorClass::ConstraintViolation,
            Self::ConservationViolated { .. } => ErrorClass::Internal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "VALIDATION_ERROR",
            Self::InvalidPoolSize { .. } => "INVALID_POOL_SIZE",
            Self::DuplicateMember { .. } => "DUPLICATE_MEMBER",
            Self::PoolSumNegative { .. } => "POOL_SUM_NEGATIVE",
            Self::DeficitShipWorse { .. } => "DEFICIT_SHIP_WORSE",
            Self::SurplusShipNegative { .. } => "SURPLUS_SHIP_NEGATIVE",
            Self::ConservationViolated { .. } => "CONSERVATION_VIOLATED",
        }
    }
}
