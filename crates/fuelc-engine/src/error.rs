//! # Engine Error Types
//!
//! [`EngineError`] wraps every lower-level error and adds the failures that
//! only the facade can produce (missing records, lock timeouts, store
//! failures). [`EngineError::class`] maps each to one [`ErrorClass`].

use thiserror::Error;

use fuelc_banking::LedgerError;
use fuelc_compliance::CalculatorError;
use fuelc_core::{CbAmount, ComplianceYear, ErrorClass, PoolId, RouteId, ShipId, ValidationError};
use fuelc_pooling::PoolError;

/// Failures of the record store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Backend unreachable or refused the write. Nothing was persisted.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The write conflicts with existing data (duplicate key).
    #[error("store conflict: {0}")]
    Conflict(String),
}

/// Any failure of an engine operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Calculator(#[from] CalculatorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("no compliance record for {ship_id} in {year}")]
    RecordNotFound { ship_id: ShipId, year: ComplianceYear },

    #[error("pool {pool_id} not found")]
    PoolNotFound { pool_id: PoolId },

    /// A ship may join at most one pool per year.
    #[error("ship {ship_id} is already in {pool_id} for {year}")]
    AlreadyPooled {
        ship_id: ShipId,
        year: ComplianceYear,
        pool_id: PoolId,
    },

    /// A pool member's stated `cb_before` is not the engine's own adjusted
    /// balance for the ship-year.
    #[error("cb_before {claimed} for {ship_id} in {year} does not match its adjusted balance {actual}")]
    CbBeforeMismatch {
        ship_id: ShipId,
        year: ComplianceYear,
        claimed: CbAmount,
        actual: CbAmount,
    },

    #[error("route {route_id} not found")]
    RouteNotFound { route_id: RouteId },

    #[error("route {route_id} already exists")]
    DuplicateRoute { route_id: RouteId },

    /// Route comparison needs a baseline route.
    #[error("no baseline route is set")]
    BaselineNotSet,

    /// The ship's ledger lock was not acquired in time. Safe to resubmit.
    #[error("timed out after {waited_ms} ms waiting for the ledger lock of {ship_id}")]
    LockTimeout { ship_id: ShipId, waited_ms: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(e) => e.class(),
            Self::Calculator(e) => e.class(),
            Self::Ledger(e) => e.class(),
            Self::Pool(e) => e.class(),
            Self::RecordNotFound { .. } | Self::PoolNotFound { .. } | Self::RouteNotFound { .. } => {
                ErrorClass::NotFound
            }
            Self::AlreadyPooled { .. }
            | Self::CbBeforeMismatch { .. }
            | Self::DuplicateRoute { .. }
            | Self::BaselineNotSet => ErrorClass::ConstraintViolation,
            Self::LockTimeout { .. } => ErrorClass::LockTimeout,
            Self::Store(_) => ErrorClass::Internal,
        }
    }

    /// Specific machine-readable code, finer than the class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::UnsupportedYear { .. }) => "UNSUPPORTED_YEAR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Calculator(CalculatorError::NoEnergyInScope { .. }) => "NO_ENERGY_IN_SCOPE",
            Self::Calculator(CalculatorError::Invalid(ValidationError::UnsupportedYear { .. })) => {
                "UNSUPPORTED_YEAR"
            }
            Self::Calculator(_) => "VALIDATION_ERROR",
            Self::Ledger(LedgerError::Invalid(ValidationError::UnsupportedYear { .. })) => {
                "UNSUPPORTED_YEAR"
            }
            Self::Ledger(LedgerError::Invalid(_)) => "VALIDATION_ERROR",
            Self::Ledger(e) => e.code(),
            Self::Pool(e) => e.code(),
            Self::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Self::PoolNotFound { .. } => "POOL_NOT_FOUND",
            Self::AlreadyPooled { .. } => "ALREADY_POOLED",
            Self::CbBeforeMismatch { .. } => "CB_BEFORE_MISMATCH",
            Self::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            Self::DuplicateRoute { .. } => "DUPLICATE_ROUTE",
            Self::BaselineNotSet => "BASELINE_NOT_SET",
            Self::LockTimeout { .. } => "LOCK_TIMEOUT",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}
