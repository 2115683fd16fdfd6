//! # Banking Error Types
//!
//! Rule rejections carry the limiting value (remaining cap, available
//! balance, outstanding deficit) so the caller can resubmit with an
//! adjusted amount.

use thiserror::Error;

use fuelc_core::{CbAmount, ComplianceYear, ErrorClass, ShipId, ValidationError};

/// Errors from ledger validation and replay.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Malformed input, e.g. a non-positive amount.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Banking requires a strictly positive compliance balance for the year.
    #[error("nothing to bank for {ship_id} in {year}: compliance balance is {cb}")]
    NothingToBank {
        ship_id: ShipId,
        year: ComplianceYear,
        cb: CbAmount,
    },

    /// Deposit exceeds what may still be banked from the source year.
    #[error("deposit of {requested} exceeds remaining bank cap {cap} for {ship_id} in {year}")]
    ExceedsBankCap {
        ship_id: ShipId,
        year: ComplianceYear,
        requested: CbAmount,
        /// Remaining cap for the year (total cap less earlier deposits).
        cap: CbAmount,
    },

    /// Applying credits requires a strictly negative compliance balance.
    #[error("no deficit to cover for {ship_id} in {year}: compliance balance is {cb}")]
    NoDeficitToCover {
        ship_id: ShipId,
        year: ComplianceYear,
        cb: CbAmount,
    },

    /// Request exceeds the ship's non-expired banked credits.
    #[error("insufficient banked amount for {ship_id}: requested {requested}, available {available}")]
    InsufficientBankedAmount {
        ship_id: ShipId,
        requested: CbAmount,
        available: CbAmount,
    },

    /// Withdrawal would overshoot the deficit still open for the year.
    #[error("withdrawal of {requested} exceeds outstanding deficit {outstanding} for {ship_id} in {year}")]
    ExceedsDeficit {
        ship_id: ShipId,
        year: ComplianceYear,
        requested: CbAmount,
        outstanding: CbAmount,
    },

    /// Source and destination of a transfer are the same ship.
    #[error("cannot transfer credits from {ship_id} to itself")]
    SameShipTransfer { ship_id: ShipId },

    /// Surplus cannot be banked from a year that has not been reached.
    #[error("cannot bank from {year}: current compliance year is {current}")]
    FutureDeposit {
        year: ComplianceYear,
        current: ComplianceYear,
    },

    /// The credit would already be past its usable window.
    #[error("cannot bank from {year}: credits from that year expired after {usable_through}")]
    SourceYearExpired {
        year: ComplianceYear,
        usable_through: u16,
    },

    /// Persisted entries do not replay to a consistent ledger.
    #[error("ledger history for {ship_id} is inconsistent: {detail}")]
    CorruptHistory { ship_id: ShipId, detail: String },
}

impl LedgerError {
    /// Classify into the shared taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Invalid(err) => err.class(),
            Self::SameShipTransfer { .. } => ErrorClass::Validation,
            Self::CorruptHistory { .. } => ErrorClass::Internal,
            Self::NothingToBank { .. }
            | Self::ExceedsBankCap { .. }
            | Self::NoDeficitToCover { .. }
            | Self::InsufficientBankedAmount { .. }
            | Self::ExceedsDeficit { .. }
            | Self::FutureDeposit { .. }
            | Self::SourceYearExpired { .. } => ErrorClass::ConstraintViolation,
        }
    }

    /// Stable machine-readable code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "INVALID_INPUT",
            Self::NothingToBank { .. } => "NOTHING_TO_BANK",
            Self::ExceedsBankCap { .. } => "EXCEEDS_BANK_CAP",
            Self::NoDeficitToCover { .. } => "NO_DEFICIT_TO_COVER",
            Self::InsufficientBankedAmount { .. } => "INSUFFICIENT_BANKED_AMOUNT",
            Self::ExceedsDeficit { .. } => "EXCEEDS_DEFICIT",
            Self::SameShipTransfer { .. } => "SAME_SHIP_TRANSFER",
            Self::FutureDeposit { .. } => "FUTURE_DEPOSIT",
            Self::SourceYearExpired { .. } => "SOURCE_YEAR_EXPIRED",
            Self::CorruptHistory { .. } => "CORRUPT_HISTORY",
        }
    }
}
