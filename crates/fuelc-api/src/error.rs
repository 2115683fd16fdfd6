//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Engine failures are mapped by their [`ErrorClass`] to an HTTP status and
//! keep their specific machine-readable code. Constraint violations carry
//! the limiting values in `details` so the caller can self-correct.
//! Internal error messages are never returned to clients.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use fuelc_banking::LedgerError;
use fuelc_core::{ErrorClass, ValidationError};
use fuelc_engine::EngineError;
use fuelc_pooling::PoolError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "EXCEEDS_BANK_CAP", "NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Limiting values of a rejected request. Never present for 500s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// Any failure reported by the accounting engine.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Engine(e) => {
                let status = match e.class() {
                    ErrorClass::Validation | ErrorClass::UnsupportedYear => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ErrorClass::ConstraintViolation => StatusCode::CONFLICT,
                    ErrorClass::NotFound => StatusCode::NOT_FOUND,
                    ErrorClass::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let code = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    "INTERNAL_ERROR"
                } else {
                    e.code()
                };
                (status, code)
            }
        }
    }

    fn is_internal(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Engine(e) => e.class() == ErrorClass::Internal,
            _ => false,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Engine(e) if !self.is_internal() => engine_details(e),
            _ => None,
        }
    }
}

/// The limiting values behind a rejected engine request.
fn engine_details(err: &EngineError) -> Option<serde_json::Value> {
    let mut details = match err {
        EngineError::Ledger(e) => ledger_details(e)?,
        EngineError::Pool(e) => pool_details(e)?,
        EngineError::Validation(ValidationError::UnsupportedYear { year, first, last }) => {
            json!({ "year": year, "first": first, "last": last })
        }
        EngineError::RecordNotFound { ship_id, year } => {
            json!({ "ship_id": ship_id, "year": year })
        }
        EngineError::PoolNotFound { pool_id } => json!({ "pool_id": pool_id }),
        EngineError::CbBeforeMismatch {
            ship_id,
            year,
            claimed,
            actual,
        } => json!({ "ship_id": ship_id, "year": year, "claimed": claimed, "actual": actual }),
        EngineError::RouteNotFound { route_id } | EngineError::DuplicateRoute { route_id } => {
            json!({ "route_id": route_id })
        }
        EngineError::AlreadyPooled {
            ship_id,
            year,
            pool_id,
        } => json!({ "ship_id": ship_id, "year": year, "pool_id": pool_id }),
        EngineError::LockTimeout { ship_id, waited_ms } => {
            json!({ "ship_id": ship_id, "waited_ms": waited_ms, "retryable": true })
        }
        _ => return None,
    };
    if let Some(map) = details.as_object_mut() {
        map.insert("class".to_string(), json!(err.class()));
    }
    Some(details)
}

fn ledger_details(err: &LedgerError) -> Option<serde_json::Value> {
    let value = match err {
        LedgerError::NothingToBank { ship_id, year, cb }
        | LedgerError::NoDeficitToCover { ship_id, year, cb } => {
            json!({ "ship_id": ship_id, "year": year, "cb": cb })
        }
        LedgerError::ExceedsBankCap {
            ship_id,
            year,
            requested,
            cap,
        } => json!({ "ship_id": ship_id, "year": year, "requested": requested, "cap": cap }),
        LedgerError::InsufficientBankedAmount {
            ship_id,
            requested,
            available,
        } => json!({ "ship_id": ship_id, "requested": requested, "available": available }),
        LedgerError::ExceedsDeficit {
            ship_id,
            year,
            requested,
            outstanding,
        } => json!({
            "ship_id": ship_id,
            "year": year,
            "requested": requested,
            "outstanding": outstanding
        }),
        LedgerError::SameShipTransfer { ship_id } => json!({ "ship_id": ship_id }),
        LedgerError::FutureDeposit { year, current } => {
            json!({ "year": year, "current_year": current })
        }
        LedgerError::SourceYearExpired {
            year,
            usable_through,
        } => json!({ "year": year, "usable_through": usable_through }),
        LedgerError::Invalid(ValidationError::NonPositiveAmount { amount }) => {
            json!({ "amount": amount })
        }
        LedgerError::Invalid(_) | LedgerError::CorruptHistory { .. } => return None,
    };
    Some(value)
}

fn pool_details(err: &PoolError) -> Option<serde_json::Value> {
    let value = match err {
        PoolError::InvalidPoolSize { size, min, max } => {
            json!({ "size": size, "min": min, "max": max })
        }
        PoolError::DuplicateMember { ship_id } => json!({ "ship_id": ship_id }),
        PoolError::PoolSumNegative { sum } => json!({ "sum": sum }),
        PoolError::DeficitShipWorse {
            ship_id,
            cb_before,
            cb_after,
        }
        | PoolError::SurplusShipNegative {
            ship_id,
            cb_before,
            cb_after,
        } => json!({ "ship_id": ship_id, "cb_before": cb_before, "cb_after": cb_after }),
        PoolError::ConservationViolated { before, after } => {
            json!({ "before": before, "after": after })
        }
        PoolError::Invalid(_) => return None,
    };
    Some(value)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = if self.is_internal() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!(error = %self, "internal server error"),
            StatusCode::SERVICE_UNAVAILABLE => tracing::warn!(error = %self, "ledger busy"),
            _ => tracing::debug!(code, error = %self, "request rejected"),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

/// Malformed identifiers, years and amounts in paths or bodies.
impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Engine(EngineError::Validation(err))
    }
}
