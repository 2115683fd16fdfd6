//! # Compliance API
//!
//! - **POST `/v1/compliance/records`** - compute and store a ship-year record
//! - **GET `/v1/compliance/records`** - list records, optionally for one ship
//! - **GET `/v1/compliance/cb/:ship_id/:year`** - raw compliance balance
//! - **GET `/v1/compliance/adjusted-cb/:ship_id/:year`** - balance after banking and pooling
//! - **POST `/v1/compliance/comparison`** - intensity against a baseline and the year's target

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use fuelc_compliance::{ComplianceRecord, IntensityComparison, RawShipYearMetrics};
use fuelc_core::{CbAmount, ComplianceYear, PoolId, ShipId};
use fuelc_engine::AdjustedPosition;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_ship, parse_year, Validate};
use crate::routes::run_engine;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Operational data of one ship for one reporting year.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordShipYearRequest {
    pub ship_id: String,
    pub year: i64,
    /// Actual GHG intensity in gCO₂e/MJ.
    pub actual_intensity: f64,
    /// Fuel consumed in metric tonnes.
    pub fuel_consumption: f64,
}

impl Validate for RecordShipYearRequest {
    fn validate(&self) -> Result<(), String> {
        if self.ship_id.trim().is_empty() {
            return Err("ship_id must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompareIntensityRequest {
    pub year: i64,
    pub baseline_intensity: f64,
    pub comparison_intensity: f64,
}

impl Validate for CompareIntensityRequest {
    fn validate(&self) -> Result<(), String> {
        if !self.baseline_intensity.is_finite() || !self.comparison_intensity.is_finite() {
            return Err("intensities must be finite numbers".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RecordQueryParams {
    pub ship_id: Option<String>,
}

/// A stored compliance record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComplianceRecordResponse {
    #[schema(value_type = String)]
    pub ship_id: ShipId,
    #[schema(value_type = u16)]
    pub year: ComplianceYear,
    pub actual_intensity: f64,
    pub target_intensity: f64,
    /// Energy in scope in MJ.
    pub energy_in_scope: f64,
    /// Compliance balance in gCO₂e, decimal string with two fraction digits.
    #[schema(value_type = String, example = "-340956000.00")]
    pub cb: CbAmount,
    pub schedule_version: String,
    pub surplus: bool,
}

impl From<ComplianceRecord> for ComplianceRecordResponse {
    fn from(r: ComplianceRecord) -> Self {
        let surplus = r.is_surplus();
        Self {
            ship_id: r.ship_id,
            year: r.year,
            actual_intensity: r.actual_intensity,
            target_intensity: r.target_intensity,
            energy_in_scope: r.energy_in_scope,
            cb: r.cb,
            schedule_version: r.schedule_version,
            surplus,
        }
    }
}

/// Raw balance and its banking and pooling adjustments.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustedPositionResponse {
    #[schema(value_type = String)]
    pub ship_id: ShipId,
    #[schema(value_type = u16)]
    pub year: ComplianceYear,
    #[schema(value_type = String)]
    pub raw_cb: CbAmount,
    #[schema(value_type = String)]
    pub banked: CbAmount,
    #[schema(value_type = String)]
    pub applied: CbAmount,
    #[schema(value_type = String)]
    pub pool_delta: CbAmount,
    #[schema(value_type = Option<String>)]
    pub pool_id: Option<PoolId>,
    /// `raw_cb − banked + applied + pool_delta`.
    #[schema(value_type = String)]
    pub adjusted_cb: CbAmount,
}

impl From<AdjustedPosition> for AdjustedPositionResponse {
    fn from(p: AdjustedPosition) -> Self {
        Self {
            ship_id: p.ship_id,
            year: p.year,
            raw_cb: p.raw_cb,
            banked: p.banked,
            applied: p.applied,
            pool_delta: p.pool_delta,
            pool_id: p.pool_id,
            adjusted_cb: p.adjusted_cb,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntensityComparisonResponse {
    #[schema(value_type = u16)]
    pub year: ComplianceYear,
    pub baseline_intensity: f64,
    pub comparison_intensity: f64,
    /// `(comparison / baseline − 1) × 100`; 0 when the baseline is 0.
    pub percent_diff: f64,
    pub target_intensity: f64,
    pub compliant: bool,
}

impl From<IntensityComparison> for IntensityComparisonResponse {
    fn from(c: IntensityComparison) -> Self {
        Self {
            year: c.year,
            baseline_intensity: c.baseline_intensity,
            comparison_intensity: c.comparison_intensity,
            percent_diff: c.percent_diff,
            target_intensity: c.target_intensity,
            compliant: c.compliant,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/compliance/records",
            get(list_records).post(record_ship_year),
        )
        .route("/v1/compliance/cb/:ship_id/:year", get(get_compliance_balance))
        .route(
            "/v1/compliance/adjusted-cb/:ship_id/:year",
            get(get_adjusted_position),
        )
        .route("/v1/compliance/comparison", post(compare_intensity))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/compliance/records - compute and store a ship-year record.
///
/// Recomputing an existing `(ship_id, year)` replaces the stored record.
#[utoipa::path(
    post,
    path = "/v1/compliance/records",
    request_body = RecordShipYearRequest,
    responses(
        (status = 200, description = "Record stored", body = ComplianceRecordResponse),
        (status = 422, description = "Invalid metrics or unsupported year", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn record_ship_year(
    State(state): State<AppState>,
    body: Result<Json<RecordShipYearRequest>, JsonRejection>,
) -> Result<Json<ComplianceRecordResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let metrics = RawShipYearMetrics {
        ship_id: parse_ship(&req.ship_id)?,
        year: req.year,
        actual_intensity: req.actual_intensity,
        fuel_consumption: req.fuel_consumption,
    };

    let record = run_engine(&state, move |engine| engine.record_ship_year(&metrics)).await?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::records::upsert(pool, &record).await {
            tracing::error!(ship_id = %record.ship_id, year = %record.year, error = %e, "failed to persist compliance record");
            return Err(AppError::Internal(
                "compliance record stored in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(record.into()))
}

/// GET /v1/compliance/records - list stored records.
#[utoipa::path(
    get,
    path = "/v1/compliance/records",
    params(("ship_id" = Option<String>, Query, description = "Restrict to one ship")),
    responses(
        (status = 200, description = "Records ordered by ship and year", body = Vec<ComplianceRecordResponse>),
    ),
    tag = "compliance"
)]
pub(crate) async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<RecordQueryParams>,
) -> Result<Json<Vec<ComplianceRecordResponse>>, AppError> {
    let ship_id = params.ship_id.as_deref().map(parse_ship).transpose()?;
    let records = run_engine(&state, move |engine| {
        engine.list_compliance_records(ship_id.as_ref())
    })
    .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /v1/compliance/cb/:ship_id/:year - raw compliance balance.
#[utoipa::path(
    get,
    path = "/v1/compliance/cb/{ship_id}/{year}",
    params(
        ("ship_id" = String, Path, description = "Ship identifier"),
        ("year" = i64, Path, description = "Compliance year"),
    ),
    responses(
        (status = 200, description = "Stored record", body = ComplianceRecordResponse),
        (status = 404, description = "No record for this ship-year", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn get_compliance_balance(
    State(state): State<AppState>,
    Path((ship_id, year)): Path<(String, i64)>,
) -> Result<Json<ComplianceRecordResponse>, AppError> {
    let ship_id = parse_ship(&ship_id)?;
    let year = parse_year(year)?;
    let record = run_engine(&state, move |engine| {
        engine.get_compliance_balance(&ship_id, year)
    })
    .await?;
    Ok(Json(record.into()))
}

/// GET /v1/compliance/adjusted-cb/:ship_id/:year - balance after banking and pooling.
#[utoipa::path(
    get,
    path = "/v1/compliance/adjusted-cb/{ship_id}/{year}",
    params(
        ("ship_id" = String, Path, description = "Ship identifier"),
        ("year" = i64, Path, description = "Compliance year"),
    ),
    responses(
        (status = 200, description = "Adjusted position", body = AdjustedPositionResponse),
        (status = 404, description = "No record for this ship-year", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn get_adjusted_position(
    State(state): State<AppState>,
    Path((ship_id, year)): Path<(String, i64)>,
) -> Result<Json<AdjustedPositionResponse>, AppError> {
    let ship_id = parse_ship(&ship_id)?;
    let year = parse_year(year)?;
    let position = run_engine(&state, move |engine| {
        engine.get_adjusted_position(&ship_id, year)
    })
    .await?;
    Ok(Json(position.into()))
}

/// POST /v1/compliance/comparison - compare an intensity with a baseline.
#[utoipa::path(
    post,
    path = "/v1/compliance/comparison",
    request_body = CompareIntensityRequest,
    responses(
        (status = 200, description = "Comparison result", body = IntensityComparisonResponse),
        (status = 422, description = "Unsupported year", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn compare_intensity(
    State(state): State<AppState>,
    body: Result<Json<CompareIntensityRequest>, JsonRejection>,
) -> Result<Json<IntensityComparisonResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let year = parse_year(req.year)?;
    let comparison = state
        .engine
        .compare_intensity(year, req.baseline_intensity, req.comparison_intensity)?;
    Ok(Json(comparison.into()))
}
