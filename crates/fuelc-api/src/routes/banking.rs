//! # Banking API
//!
//! HTTP surface of the banking ledger:
//!
//! - **POST `/v1/banking/bank`** - bank part of a year's surplus
//! - **POST `/v1/banking/apply`** - apply banked credits to a deficit year
//! - **POST `/v1/banking/transfer`** - move banked credits to another ship
//! - **GET `/v1/banking/:ship_id/balance`** - available (non-expired) balance
//! - **GET `/v1/banking/:ship_id/summary`** - active credits, totals by kind, expiring amount, utilization
//! - **GET `/v1/banking/:ship_id/expiring`** - credits in their last usable years
//! - **GET `/v1/banking/:ship_id/entries`** - the ship's ledger, chronological
//!
//! Amounts are decimal strings in gCO₂e with at most two fraction digits.
//! Rejections carry the limiting value (remaining cap, available balance,
//! outstanding deficit) in `error.details`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use fuelc_banking::{ActiveCredit, CreditDraw, EntryKind, KindTotals, LedgerEntry, LedgerSummary};
use fuelc_core::{CbAmount, ComplianceYear, EntryId, ShipId, Timestamp};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_amount, parse_ship, parse_year, Validate};
use crate::routes::run_engine;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Bank or apply request for one ship-year.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LedgerAmountRequest {
    pub ship_id: String,
    /// Source year when banking; deficit year when applying.
    pub year: i64,
    #[schema(example = "1200.00")]
    pub amount: String,
}

impl Validate for LedgerAmountRequest {
    fn validate(&self) -> Result<(), String> {
        if self.ship_id.trim().is_empty() {
            return Err("ship_id must not be empty".to_string());
        }
        if self.amount.trim().is_empty() {
            return Err("amount must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub from_ship_id: String,
    pub to_ship_id: String,
    #[schema(example = "500.00")]
    pub amount: String,
}

impl Validate for TransferRequest {
    fn validate(&self) -> Result<(), String> {
        if self.from_ship_id.trim().is_empty() || self.to_ship_id.trim().is_empty() {
            return Err("from_ship_id and to_ship_id must not be empty".to_string());
        }
        if self.amount.trim().is_empty() {
            return Err("amount must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ExpiringQueryParams {
    /// Look-ahead in compliance years, the current one included. Default 1.
    pub within_years: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EntryQueryParams {
    /// Restrict to entries booked against this year.
    pub year: Option<i64>,
}

/// Credits taken from one source year.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditDrawResponse {
    #[schema(value_type = u16)]
    pub source_year: ComplianceYear,
    #[schema(value_type = String)]
    pub amount: CbAmount,
}

impl From<CreditDraw> for CreditDrawResponse {
    fn from(d: CreditDraw) -> Self {
        Self {
            source_year: d.source_year,
            amount: d.amount,
        }
    }
}

/// One ledger entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: EntryId,
    #[schema(value_type = String)]
    pub ship_id: ShipId,
    #[schema(value_type = u16)]
    pub year: ComplianceYear,
    /// Signed: positive for deposits, negative for credit-consuming kinds.
    #[schema(value_type = String)]
    pub amount: CbAmount,
    /// DEPOSIT, WITHDRAWAL, TRANSFER or EXPIRED.
    #[schema(value_type = String)]
    pub kind: EntryKind,
    #[schema(value_type = Option<String>)]
    pub counterparty_ship_id: Option<ShipId>,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub transfer_ref: Option<EntryId>,
    pub draws: Vec<CreditDrawResponse>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(e: LedgerEntry) -> Self {
        Self {
            id: e.id,
            ship_id: e.ship_id,
            year: e.year,
            amount: e.amount,
            kind: e.kind,
            counterparty_ship_id: e.counterparty_ship_id,
            transfer_ref: e.transfer_ref,
            draws: e.draws.into_iter().map(Into::into).collect(),
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String)]
    pub ship_id: ShipId,
    /// Compliance year expiry was evaluated against.
    #[schema(value_type = u16)]
    pub as_of: ComplianceYear,
    #[schema(value_type = String)]
    pub available_balance: CbAmount,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActiveCreditResponse {
    #[schema(value_type = String, format = Uuid)]
    pub entry_id: EntryId,
    #[schema(value_type = u16)]
    pub source_year: ComplianceYear,
    #[schema(value_type = String)]
    pub remaining: CbAmount,
    pub usable_through: u16,
}

impl From<ActiveCredit> for ActiveCreditResponse {
    fn from(c: ActiveCredit) -> Self {
        Self {
            entry_id: c.entry_id,
            source_year: c.source_year,
            remaining: c.remaining,
            usable_through: c.usable_through,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KindTotalsResponse {
    #[schema(value_type = String)]
    pub deposited: CbAmount,
    #[schema(value_type = String)]
    pub received: CbAmount,
    #[schema(value_type = String)]
    pub withdrawn: CbAmount,
    #[schema(value_type = String)]
    pub transferred_out: CbAmount,
    #[schema(value_type = String)]
    pub expired: CbAmount,
}

impl From<KindTotals> for KindTotalsResponse {
    fn from(t: KindTotals) -> Self {
        Self {
            deposited: t.deposited,
            received: t.received,
            withdrawn: t.withdrawn,
            transferred_out: t.transferred_out,
            expired: t.expired,
        }
    }
}

/// Banking statistics of one ship.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerSummaryResponse {
    #[schema(value_type = String)]
    pub ship_id: ShipId,
    #[schema(value_type = u16)]
    pub as_of: ComplianceYear,
    #[schema(value_type = String)]
    pub available_balance: CbAmount,
    /// Oldest first; the order credits are consumed in.
    pub active_credits: Vec<ActiveCreditResponse>,
    /// Credits whose last usable year is `as_of`.
    #[schema(value_type = String)]
    pub expiring_soon: CbAmount,
    /// `(withdrawn + transferred out) / (deposited + received)` in percent.
    pub utilization_rate: f64,
    pub totals: KindTotalsResponse,
    pub entry_count: usize,
}

impl From<LedgerSummary> for LedgerSummaryResponse {
    fn from(s: LedgerSummary) -> Self {
        Self {
            ship_id: s.ship_id,
            as_of: s.as_of,
            available_balance: s.available_balance,
            active_credits: s.active_credits.into_iter().map(Into::into).collect(),
            expiring_soon: s.expiring_soon,
            utilization_rate: s.utilization_rate,
            totals: s.totals.into(),
            entry_count: s.entry_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/banking/bank", post(bank_surplus))
        .route("/v1/banking/apply", post(apply_banked_surplus))
        .route("/v1/banking/transfer", post(transfer_credits))
        .route("/v1/banking/:ship_id/balance", get(get_available_balance))
        .route("/v1/banking/:ship_id/summary", get(get_ledger_summary))
        .route("/v1/banking/:ship_id/expiring", get(get_expiring_credits))
        .route("/v1/banking/:ship_id/entries", get(list_ledger_entries))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/banking/bank - bank part of a year's surplus.
#[utoipa::path(
    post,
    path = "/v1/banking/bank",
    request_body = LedgerAmountRequest,
    responses(
        (status = 201, description = "Deposit appended", body = LedgerEntryResponse),
        (status = 404, description = "No compliance record for the ship-year", body = crate::error::ErrorBody),
        (status = 409, description = "Nothing to bank or bank cap exceeded", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger lock timeout; retry", body = crate::error::ErrorBody),
    ),
    tag = "banking"
)]
pub(crate) async fn bank_surplus(
    State(state): State<AppState>,
    body: Result<Json<LedgerAmountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LedgerEntryResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let ship_id = parse_ship(&req.ship_id)?;
    let year = parse_year(req.year)?;
    let amount = parse_amount(&req.amount)?;

    let ship = ship_id.clone();
    let entry = run_engine(&state, move |engine| engine.bank_surplus(&ship, year, amount)).await?;
    state.persist_ledgers(&[ship_id]).await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// POST /v1/banking/apply - apply banked credits to a deficit, oldest first.
#[utoipa::path(
    post,
    path = "/v1/banking/apply",
    request_body = LedgerAmountRequest,
    responses(
        (status = 201, description = "Withdrawal appended", body = LedgerEntryResponse),
        (status = 404, description = "No compliance record for the ship-year", body = crate::error::ErrorBody),
        (status = 409, description = "No deficit, insufficient balance, or deficit exceeded", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger lock timeout; retry", body = crate::error::ErrorBody),
    ),
    tag = "banking"
)]
pub(crate) async fn apply_banked_surplus(
    State(state): State<AppState>,
    body: Result<Json<LedgerAmountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LedgerEntryResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let ship_id = parse_ship(&req.ship_id)?;
    let year = parse_year(req.year)?;
    let amount = parse_amount(&req.amount)?;

    let ship = ship_id.clone();
    let entry = run_engine(&state, move |engine| {
        engine.apply_banked_surplus(&ship, year, amount)
    })
    .await?;
    state.persist_ledgers(&[ship_id]).await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// POST /v1/banking/transfer - move banked credits between ships.
///
/// Returns the sender's `TRANSFER` entry. The receiver's deposits carry its
/// id as `transfer_ref`.
#[utoipa::path(
    post,
    path = "/v1/banking/transfer",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer appended to both ledgers", body = LedgerEntryResponse),
        (status = 409, description = "Insufficient balance or same-ship transfer", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger lock timeout; retry", body = crate::error::ErrorBody),
    ),
    tag = "banking"
)]
pub(crate) async fn transfer_credits(
    State(state): State<AppState>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LedgerEntryResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let from = parse_ship(&req.from_ship_id)?;
    let to = parse_ship(&req.to_ship_id)?;
    let amount = parse_amount(&req.amount)?;

    let (sender, receiver) = (from.clone(), to.clone());
    let entry = run_engine(&state, move |engine| {
        engine.transfer_credits(&sender, &receiver, amount)
    })
    .await?;
    state.persist_ledgers(&[from, to]).await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// GET /v1/banking/:ship_id/balance - sum of non-expired banked credits.
#[utoipa::path(
    get,
    path = "/v1/banking/{ship_id}/balance",
    params(("ship_id" = String, Path, description = "Ship identifier")),
    responses(
        (status = 200, description = "Available balance", body = BalanceResponse),
    ),
    tag = "banking"
)]
pub(crate) async fn get_available_balance(
    State(state): State<AppState>,
    Path(ship_id): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let ship_id = parse_ship(&ship_id)?;
    let ship = ship_id.clone();
    let (as_of, available_balance) = run_engine(&state, move |engine| {
        let as_of = engine.current_year()?;
        Ok((as_of, engine.get_available_balance(&ship)?))
    })
    .await?;
    state.persist_ledgers(std::slice::from_ref(&ship_id)).await?;

    Ok(Json(BalanceResponse {
        ship_id,
        as_of,
        available_balance,
    }))
}

/// GET /v1/banking/:ship_id/summary - active credits and totals by kind.
#[utoipa::path(
    get,
    path = "/v1/banking/{ship_id}/summary",
    params(("ship_id" = String, Path, description = "Ship identifier")),
    responses(
        (status = 200, description = "Banking statistics", body = LedgerSummaryResponse),
    ),
    tag = "banking"
)]
pub(crate) async fn get_ledger_summary(
    State(state): State<AppState>,
    Path(ship_id): Path<String>,
) -> Result<Json<LedgerSummaryResponse>, AppError> {
    let ship_id = parse_ship(&ship_id)?;
    let ship = ship_id.clone();
    let summary = run_engine(&state, move |engine| engine.get_ledger_summary(&ship)).await?;
    state.persist_ledgers(&[ship_id]).await?;
    Ok(Json(summary.into()))
}

/// GET /v1/banking/:ship_id/expiring - credits that lapse within the look-ahead.
#[utoipa::path(
    get,
    path = "/v1/banking/{ship_id}/expiring",
    params(
        ("ship_id" = String, Path, description = "Ship identifier"),
        ("within_years" = Option<u16>, Query, description = "Look-ahead in compliance years, default 1"),
    ),
    responses(
        (status = 200, description = "Expiring credits, oldest first", body = Vec<ActiveCreditResponse>),
        (status = 422, description = "Look-ahead of zero years", body = crate::error::ErrorBody),
    ),
    tag = "banking"
)]
pub(crate) async fn get_expiring_credits(
    State(state): State<AppState>,
    Path(ship_id): Path<String>,
    Query(params): Query<ExpiringQueryParams>,
) -> Result<Json<Vec<ActiveCreditResponse>>, AppError> {
    let ship_id = parse_ship(&ship_id)?;
    let within_years = params.within_years.unwrap_or(1);
    if within_years == 0 {
        return Err(AppError::Validation("within_years must be at least 1".to_string()));
    }
    let ship = ship_id.clone();
    let credits = run_engine(&state, move |engine| {
        engine.get_expiring_credits(&ship, within_years)
    })
    .await?;
    state.persist_ledgers(&[ship_id]).await?;
    Ok(Json(credits.into_iter().map(Into::into).collect()))
}

/// GET /v1/banking/:ship_id/entries - ledger entries in append order.
#[utoipa::path(
    get,
    path = "/v1/banking/{ship_id}/entries",
    params(
        ("ship_id" = String, Path, description = "Ship identifier"),
        ("year" = Option<i64>, Query, description = "Restrict to entries booked against this year"),
    ),
    responses(
        (status = 200, description = "Ledger entries", body = Vec<LedgerEntryResponse>),
    ),
    tag = "banking"
)]
pub(crate) async fn list_ledger_entries(
    State(state): State<AppState>,
    Path(ship_id): Path<String>,
    Query(params): Query<EntryQueryParams>,
) -> Result<Json<Vec<LedgerEntryResponse>>, AppError> {
    let ship_id = parse_ship(&ship_id)?;
    let year = params.year.map(parse_year).transpose()?;
    let entries = run_engine(&state, move |engine| {
        engine.list_ledger_entries(&ship_id, year)
    })
    .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
