//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "fuelc: fuel-intensity compliance engine",
        version = "0.1.0",
        description = "Compliance balances, banking of surplus, transfers between ships, pooling and route comparison under the FuelEU Maritime rules.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Compliance
        crate::routes::compliance::record_ship_year,
        crate::routes::compliance::list_records,
        crate::routes::compliance::get_compliance_balance,
        crate::routes::compliance::get_adjusted_position,
        crate::routes::compliance::compare_intensity,
        // Banking
        crate::routes::banking::bank_surplus,
        crate::routes::banking::apply_banked_surplus,
        crate::routes::banking::transfer_credits,
        crate::routes::banking::get_available_balance,
        crate::routes::banking::get_ledger_summary,
        crate::routes::banking::get_expiring_credits,
        crate::routes::banking::list_ledger_entries,
        // Pooling
        crate::routes::pooling::create_pool,
        crate::routes::pooling::list_pools,
        crate::routes::pooling::get_pool,
        // Route catalogue
        crate::routes::catalogue::add_route,
        crate::routes::catalogue::list_routes,
        crate::routes::catalogue::get_route,
        crate::routes::catalogue::set_baseline,
        crate::routes::catalogue::compare_routes,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Compliance DTOs
        crate::routes::compliance::RecordShipYearRequest,
        crate::routes::compliance::CompareIntensityRequest,
        crate::routes::compliance::ComplianceRecordResponse,
        crate::routes::compliance::AdjustedPositionResponse,
        crate::routes::compliance::IntensityComparisonResponse,
        // Banking DTOs
        crate::routes::banking::LedgerAmountRequest,
        crate::routes::banking::TransferRequest,
        crate::routes::banking::CreditDrawResponse,
        crate::routes::banking::LedgerEntryResponse,
        crate::routes::banking::BalanceResponse,
        crate::routes::banking::ActiveCreditResponse,
        crate::routes::banking::KindTotalsResponse,
        crate::routes::banking::LedgerSummaryResponse,
        // Pooling DTOs
        crate::routes::pooling::PoolMemberBody,
        crate::routes::pooling::CreatePoolRequest,
        crate::routes::pooling::PoolMemberResponse,
        crate::routes::pooling::PoolResponse,
        // Route catalogue DTOs
        crate::routes::catalogue::CreateRouteRequest,
        crate::routes::catalogue::RouteResponse,
        crate::routes::catalogue::RouteComparisonResponse,
    )),
    tags(
        (name = "compliance", description = "Compliance balances and intensity comparison"),
        (name = "banking", description = "Banking ledger: bank, apply, transfer"),
        (name = "pooling", description = "Pooling of compliance balances"),
        (name = "routes", description = "Route catalogue and baseline comparison"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
