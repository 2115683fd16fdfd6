//! # Error Types: Shared Validation Errors and Taxonomy
//!
//! Input validation failures shared by every crate, and the [`ErrorClass`]
//! taxonomy used to report any failure to a caller.
//!
//! ## Design
//!
//! - Every error carries the offending value so a user can self-correct.
//! - Classification is total: each crate-level error maps to exactly one class.
//! - Only [`ErrorClass::LockTimeout`] is retryable. Business-rule rejections
//!   are terminal for the request that caused them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::CbAmount;

/// Malformed or out-of-range input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Ship identifiers must be 1-64 characters of `[A-Za-z0-9_-]`.
    #[error("invalid ship identifier {0:?}")]
    InvalidShipId(String),

    /// Route codes follow the same rules as ship identifiers.
    #[error("invalid route identifier {0:?}")]
    InvalidRouteId(String),

    /// Year outside the regulatory schedule or the active window.
    #[error("unsupported compliance year {year} (supported: {first}..={last})")]
    UnsupportedYear {
        /// The rejected year.
        year: i64,
        /// First supported year.
        first: u16,
        /// Last supported year.
        last: u16,
    },

    /// Amount string could not be parsed.
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    /// Amount carries more than two decimal places.
    #[error("amount {0:?} has more than 2 decimal places")]
    AmountTooPrecise(String),

    /// Amount does not fit the fixed-point representation.
    #[error("amount out of range: {0}")]
    AmountOutOfRange(String),

    /// Ledger and pool operations require a strictly positive amount.
    #[error("amount must be strictly positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: CbAmount,
    },

    /// Operational inputs (intensity, fuel mass) must be non-negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeInput {
        /// Name of the input field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Target schedule definition is malformed.
    #[error("invalid target schedule: {0}")]
    InvalidSchedule(String),

    /// Timestamp string is not RFC 3339 UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Operational inputs must be finite numbers.
    #[error("{field} must be a finite number")]
    NonFiniteInput {
        /// Name of the input field.
        field: &'static str,
    },
}

impl ValidationError {
    /// Classify this error. Year errors have their own class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedYear { .. } => ErrorClass::UnsupportedYear,
            _ => ErrorClass::Validation,
        }
    }
}

/// Classification of every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Malformed or out-of-range input. Caller error, not retried.
    Validation,
    /// A regulatory rule was broken (bank cap, balance, pool constraints).
    ConstraintViolation,
    /// No compliance record (or pool) for the requested key.
    NotFound,
    /// Year outside the regulatory schedule.
    UnsupportedYear,
    /// A per-ship ledger lock could not be acquired in time. Retryable.
    LockTimeout,
    /// Store or invariant failure.
    Internal,
}

impl ErrorClass {
    /// Whether the caller may resubmit the identical request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::ConstraintViolation => "CONSTRAINT_VIOLATION",
            Self::NotFound => "NOT_FOUND",
            Self::UnsupportedYear => "UNSUPPORTED_YEAR",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::Internal => "INTERNAL_ERROR",
        };
        f.write_str(s)
    }
}
