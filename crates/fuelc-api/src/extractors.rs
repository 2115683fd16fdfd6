//! # Request Extraction & Validation
//!
//! The [`Validate`] trait for request DTOs, a helper that extracts and
//! validates JSON bodies, and parsers turning raw path and body fields into
//! the engine's validated domain types.

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use fuelc_core::{CbAmount, ComplianceYear, RouteId, ShipId};

use crate::error::AppError;

/// Shape checks beyond what serde deserialization enforces.
pub trait Validate {
    /// Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

pub fn parse_ship(raw: &str) -> Result<ShipId, AppError> {
    Ok(ShipId::new(raw)?)
}

pub fn parse_route(raw: &str) -> Result<RouteId, AppError> {
    Ok(RouteId::new(raw)?)
}

pub fn parse_year(raw: i64) -> Result<ComplianceYear, AppError> {
    Ok(ComplianceYear::new(raw)?)
}

/// Amounts travel as decimal strings with at most two fraction digits.
pub fn parse_amount(raw: &str) -> Result<CbAmount, AppError> {
    Ok(CbAmount::from_str(raw)?)
}
