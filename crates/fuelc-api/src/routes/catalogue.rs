//! # Route Catalogue API
//!
//! - **POST `/v1/routes`** - add a route to the catalogue
//! - **GET `/v1/routes`** - list routes, filtered by `vessel_type`, `fuel_type`, `year`
//! - **GET `/v1/routes/:route_id`** - one route
//! - **POST `/v1/routes/:route_id/baseline`** - make the route the single baseline
//! - **GET `/v1/routes/comparison`** - every other route against the baseline
//!
//! Vessel and fuel types travel as their catalogue labels (`BulkCarrier`,
//! `LNG`). Unknown labels are 422, not 400.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use fuelc_compliance::{FuelType, NewRoute, Route, RouteComparison, RouteFilter, VesselType};
use fuelc_core::{ComplianceYear, RouteId, Timestamp};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_route, parse_year, Validate};
use crate::routes::run_engine;
use crate::state::AppState;

/// Comparisons rate against this year's target unless `target_year` is given.
const DEFAULT_TARGET_YEAR: i64 = ComplianceYear::FIRST as i64;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRouteRequest {
    #[schema(example = "R001")]
    pub route_id: String,
    /// Container, BulkCarrier, Tanker or RoRo.
    #[schema(example = "Container")]
    pub vessel_type: String,
    /// HFO, LNG or MGO.
    #[schema(example = "HFO")]
    pub fuel_type: String,
    pub year: i64,
    /// gCO₂e/MJ.
    pub ghg_intensity: f64,
    /// Tonnes.
    pub fuel_consumption: f64,
    /// Kilometres.
    pub distance: f64,
    /// Tonnes CO₂e.
    pub total_emissions: f64,
}

impl Validate for CreateRouteRequest {
    fn validate(&self) -> Result<(), String> {
        if self.route_id.trim().is_empty() {
            return Err("route_id must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RouteQueryParams {
    pub vessel_type: Option<String>,
    pub fuel_type: Option<String>,
    pub year: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ComparisonQueryParams {
    pub target_year: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RouteResponse {
    #[schema(value_type = String)]
    pub route_id: RouteId,
    #[schema(value_type = String)]
    pub vessel_type: VesselType,
    #[schema(value_type = String)]
    pub fuel_type: FuelType,
    #[schema(value_type = u16)]
    pub year: ComplianceYear,
    pub ghg_intensity: f64,
    pub fuel_consumption: f64,
    pub distance: f64,
    pub total_emissions: f64,
    pub is_baseline: bool,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: Timestamp,
}

impl From<Route> for RouteResponse {
    fn from(r: Route) -> Self {
        Self {
            route_id: r.route_id,
            vessel_type: r.vessel_type,
            fuel_type: r.fuel_type,
            year: r.year,
            ghg_intensity: r.ghg_intensity,
            fuel_consumption: r.fuel_consumption,
            distance: r.distance,
            total_emissions: r.total_emissions,
            is_baseline: r.is_baseline,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// One route rated against the baseline and the target year.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RouteComparisonResponse {
    pub baseline: RouteResponse,
    pub comparison: RouteResponse,
    /// `(comparison / baseline − 1) × 100` of the GHG intensities.
    pub percent_diff: f64,
    pub target_intensity: f64,
    pub compliant: bool,
}

impl From<RouteComparison> for RouteComparisonResponse {
    fn from(c: RouteComparison) -> Self {
        Self {
            baseline: c.baseline.into(),
            comparison: c.comparison.into(),
            percent_diff: c.percent_diff,
            target_intensity: c.target_intensity,
            compliant: c.compliant,
        }
    }
}

fn parse_vessel(raw: &str) -> Result<VesselType, AppError> {
    raw.parse().map_err(AppError::Validation)
}

fn parse_fuel(raw: &str) -> Result<FuelType, AppError> {
    raw.parse().map_err(AppError::Validation)
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/routes", post(add_route).get(list_routes))
        .route("/v1/routes/comparison", get(compare_routes))
        .route("/v1/routes/:route_id", get(get_route))
        .route("/v1/routes/:route_id/baseline", post(set_baseline))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/routes - add a route to the catalogue.
#[utoipa::path(
    post,
    path = "/v1/routes",
    request_body = CreateRouteRequest,
    responses(
        (status = 201, description = "Route stored", body = RouteResponse),
        (status = 409, description = "Route id already in the catalogue", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown label, unsupported year or negative quantity", body = crate::error::ErrorBody),
    ),
    tag = "routes"
)]
pub(crate) async fn add_route(
    State(state): State<AppState>,
    body: Result<Json<CreateRouteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RouteResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let new = NewRoute {
        route_id: parse_route(&req.route_id)?,
        vessel_type: parse_vessel(&req.vessel_type)?,
        fuel_type: parse_fuel(&req.fuel_type)?,
        year: req.year,
        ghg_intensity: req.ghg_intensity,
        fuel_consumption: req.fuel_consumption,
        distance: req.distance,
        total_emissions: req.total_emissions,
    };

    let route = run_engine(&state, move |engine| engine.add_route(new)).await?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::routes::insert(pool, &route).await {
            tracing::error!(route_id = %route.route_id, error = %e, "failed to persist route");
            return Err(AppError::Internal(
                "route stored in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((StatusCode::CREATED, Json(route.into())))
}

/// GET /v1/routes - list catalogue routes in insertion order.
#[utoipa::path(
    get,
    path = "/v1/routes",
    params(
        ("vessel_type" = Option<String>, Query, description = "Only this vessel type"),
        ("fuel_type" = Option<String>, Query, description = "Only this fuel type"),
        ("year" = Option<i64>, Query, description = "Only this compliance year"),
    ),
    responses(
        (status = 200, description = "Matching routes", body = Vec<RouteResponse>),
        (status = 422, description = "Unknown filter label or year", body = crate::error::ErrorBody),
    ),
    tag = "routes"
)]
pub(crate) async fn list_routes(
    State(state): State<AppState>,
    Query(params): Query<RouteQueryParams>,
) -> Result<Json<Vec<RouteResponse>>, AppError> {
    let filter = RouteFilter {
        vessel_type: params.vessel_type.as_deref().map(parse_vessel).transpose()?,
        fuel_type: params.fuel_type.as_deref().map(parse_fuel).transpose()?,
        year: params.year.map(parse_year).transpose()?,
    };
    let routes = run_engine(&state, move |engine| engine.list_routes(&filter)).await?;
    Ok(Json(routes.into_iter().map(Into::into).collect()))
}

/// GET /v1/routes/:route_id - one catalogue route.
#[utoipa::path(
    get,
    path = "/v1/routes/{route_id}",
    params(("route_id" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "The route", body = RouteResponse),
        (status = 404, description = "Unknown route", body = crate::error::ErrorBody),
    ),
    tag = "routes"
)]
pub(crate) async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<Json<RouteResponse>, AppError> {
    let route_id = parse_route(&route_id)?;
    let route = run_engine(&state, move |engine| engine.get_route(&route_id)).await?;
    Ok(Json(route.into()))
}

/// POST /v1/routes/:route_id/baseline - make the route the single baseline.
#[utoipa::path(
    post,
    path = "/v1/routes/{route_id}/baseline",
    params(("route_id" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "The new baseline", body = RouteResponse),
        (status = 404, description = "Unknown route", body = crate::error::ErrorBody),
    ),
    tag = "routes"
)]
pub(crate) async fn set_baseline(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<Json<RouteResponse>, AppError> {
    let route_id = parse_route(&route_id)?;
    let route = run_engine(&state, move |engine| engine.set_baseline(&route_id)).await?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::routes::set_baseline(pool, &route).await {
            tracing::error!(route_id = %route.route_id, error = %e, "failed to persist baseline");
            return Err(AppError::Internal(
                "baseline set in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(route.into()))
}

/// GET /v1/routes/comparison - rate every other route against the baseline.
#[utoipa::path(
    get,
    path = "/v1/routes/comparison",
    params(("target_year" = Option<i64>, Query, description = "Year whose target rates compliance; defaults to 2025")),
    responses(
        (status = 200, description = "One row per non-baseline route", body = Vec<RouteComparisonResponse>),
        (status = 409, description = "No baseline set", body = crate::error::ErrorBody),
        (status = 422, description = "Year without a target", body = crate::error::ErrorBody),
    ),
    tag = "routes"
)]
pub(crate) async fn compare_routes(
    State(state): State<AppState>,
    Query(params): Query<ComparisonQueryParams>,
) -> Result<Json<Vec<RouteComparisonResponse>>, AppError> {
    let target_year = parse_year(params.target_year.unwrap_or(DEFAULT_TARGET_YEAR))?;
    let rows = run_engine(&state, move |engine| engine.compare_routes(target_year)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
