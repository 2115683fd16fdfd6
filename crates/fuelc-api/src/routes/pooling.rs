//! # Pooling API
//!
//! - **POST `/v1/pools`** - allocate and store a pool for one year
//! - **GET `/v1/pools`** - list pools, optionally for one year
//! - **GET `/v1/pools/:pool_id`** - one pool with its allocation

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use fuelc_core::{CbAmount, ComplianceYear, PoolId, ShipId, Timestamp};
use fuelc_engine::PoolMemberRequest;
use fuelc_pooling::{Pool, PoolMember};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_amount, parse_ship, parse_year, Validate};
use crate::routes::run_engine;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct PoolMemberBody {
    pub ship_id: String,
    /// Balance the caller expects the ship to enter with. The pool always
    /// uses the ship's adjusted compliance balance for the pool year; a
    /// differing value is rejected with `CB_BEFORE_MISMATCH`.
    #[schema(example = "150000.00")]
    pub cb_before: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePoolRequest {
    pub year: i64,
    pub members: Vec<PoolMemberBody>,
}

impl Validate for CreatePoolRequest {
    fn validate(&self) -> Result<(), String> {
        if self.members.iter().any(|m| m.ship_id.trim().is_empty()) {
            return Err("every member needs a ship_id".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PoolQueryParams {
    pub year: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolMemberResponse {
    #[schema(value_type = String)]
    pub ship_id: ShipId,
    #[schema(value_type = String)]
    pub cb_before: CbAmount,
    #[schema(value_type = String)]
    pub cb_after: CbAmount,
}

impl From<PoolMember> for PoolMemberResponse {
    fn from(m: PoolMember) -> Self {
        Self {
            ship_id: m.ship_id,
            cb_before: m.cb_before,
            cb_after: m.cb_after,
        }
    }
}

/// An allocated pool. Members keep request order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolResponse {
    #[schema(value_type = String, format = Uuid)]
    pub pool_id: PoolId,
    #[schema(value_type = u16)]
    pub year: ComplianceYear,
    pub members: Vec<PoolMemberResponse>,
    /// Sum of member balances; equal before and after allocation.
    #[schema(value_type = String)]
    pub total: CbAmount,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
}

impl From<Pool> for PoolResponse {
    fn from(p: Pool) -> Self {
        let total = p.total();
        Self {
            pool_id: p.id,
            year: p.year,
            members: p.members.into_iter().map(Into::into).collect(),
            total,
            created_at: p.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/pools", get(list_pools).post(create_pool))
        .route("/v1/pools/:pool_id", get(get_pool))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/pools - allocate surplus to deficits and store the pool.
#[utoipa::path(
    post,
    path = "/v1/pools",
    request_body = CreatePoolRequest,
    responses(
        (status = 201, description = "Pool created", body = PoolResponse),
        (status = 404, description = "A member has no compliance record for the year", body = crate::error::ErrorBody),
        (status = 409, description = "Pool sum negative, already pooled member or cb_before mismatch", body = crate::error::ErrorBody),
        (status = 422, description = "Size out of range, duplicate member or amount out of range", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger lock timeout; retry", body = crate::error::ErrorBody),
    ),
    tag = "pooling"
)]
pub(crate) async fn create_pool(
    State(state): State<AppState>,
    body: Result<Json<CreatePoolRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PoolResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let year = parse_year(req.year)?;
    let members = req
        .members
        .iter()
        .map(|m| {
            Ok(PoolMemberRequest {
                ship_id: parse_ship(&m.ship_id)?,
                cb_before: m.cb_before.as_deref().map(parse_amount).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let pool = run_engine(&state, move |engine| engine.create_pool(year, &members)).await?;

    if let Some(db) = &state.db_pool {
        if let Err(e) = crate::db::pools::insert(db, &pool).await {
            tracing::error!(pool_id = %pool.id, error = %e, "failed to persist pool");
            return Err(AppError::Internal(
                "pool created in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok((StatusCode::CREATED, Json(pool.into())))
}

/// GET /v1/pools - list pools in creation order.
#[utoipa::path(
    get,
    path = "/v1/pools",
    params(("year" = Option<i64>, Query, description = "Restrict to one compliance year")),
    responses(
        (status = 200, description = "Pools", body = Vec<PoolResponse>),
    ),
    tag = "pooling"
)]
pub(crate) async fn list_pools(
    State(state): State<AppState>,
    Query(params): Query<PoolQueryParams>,
) -> Result<Json<Vec<PoolResponse>>, AppError> {
    let year = params.year.map(parse_year).transpose()?;
    let pools = run_engine(&state, move |engine| engine.list_pools(year)).await?;
    Ok(Json(pools.into_iter().map(Into::into).collect()))
}

/// GET /v1/pools/:pool_id - one pool.
#[utoipa::path(
    get,
    path = "/v1/pools/{pool_id}",
    params(("pool_id" = Uuid, Path, description = "Pool identifier")),
    responses(
        (status = 200, description = "Pool", body = PoolResponse),
        (status = 404, description = "Pool not found", body = crate::error::ErrorBody),
    ),
    tag = "pooling"
)]
pub(crate) async fn get_pool(
    State(state): State<AppState>,
    Path(pool_id): Path<Uuid>,
) -> Result<Json<PoolResponse>, AppError> {
    let pool_id = PoolId(pool_id);
    let pool = run_engine(&state, move |engine| engine.get_pool(&pool_id)).await?;
    Ok(Json(pool.into()))
}
