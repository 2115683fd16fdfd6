//! # fuelc-api: Axum API for the Compliance Engine
//!
//! Maps the accounting engine's operations 1:1 to HTTP endpoints.
//!
//! ## API Surface
//!
//! | Prefix                 | Module                   | Domain                  |
//! |------------------------|--------------------------|-------------------------|
//! | `/v1/compliance/*`     | [`routes::compliance`]   | Compliance balances     |
//! | `/v1/banking/*`        | [`routes::banking`]      | Banking ledger          |
//! | `/v1/pools/*`          | [`routes::pooling`]      | Pooling                 |
//! | `/v1/routes/*`         | [`routes::catalogue`]    | Route catalogue         |
//! | `/openapi.json`        | [`openapi`]              | OpenAPI document        |
//! | `/health/*`, `/metrics`| this module              | Probes and counters     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → BodyLimit → Handler
//! ```
//!
//! ## Error Contract
//!
//! Every failure is `{ "error": { "code", "message", "details"? } }`.
//! Validation and unsupported-year errors are 422, rule violations 409,
//! missing records 404, ledger lock timeouts 503 with `Retry-After`.

pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health health and `/metrics` sit outside the metrics middleware so
/// scrapes do not count themselves.
pub fn app(state: AppState) -> Router {
    let metrics = match ApiMetrics::new() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::error!("metrics registry unavailable, /metrics disabled: {e}");
            None
        }
    };

    // Middleware execution order (outermost → innermost):
    //   TraceLayer → MetricsMiddleware → BodyLimit → Handler
    let mut api = Router::new()
        .merge(routes::compliance::router())
        .merge(routes::banking::router())
        .merge(routes::pooling::router())
        .merge(routes::catalogue::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    if let Some(metrics) = &metrics {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api.layer(TraceLayer::new_for_http()).with_state(state.clone());

    let mut health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if let Some(metrics) = metrics {
        health = health
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    Router::new().merge(health.with_state(state)).merge(api)
}

/// Connect persistence, hydrate the store and serve until the listener fails.
///
/// Expects a tracing subscriber to be installed by the caller.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Absent DATABASE_URL means in-memory only.
    let db_pool = db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;

    let port = config.port;
    let state = AppState::with_config(config, db_pool);

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    tracing::info!(
        compliance_year = %state.engine.current_year()?,
        lock_timeout_ms = state.config.lock_timeout_ms(),
        schedule = state.config.schedule.version(),
        "accounting engine ready"
    );

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("fuelc API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Liveness check: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: checks the database when one is configured.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
        }
    }
    (StatusCode::OK, "ready")
}

/// GET /metrics - Prometheus scrape endpoint.
///
/// Store gauges are refreshed from the engine on each scrape.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let pools = state
        .engine
        .list_pools(None)
        .map(|p| p.len())
        .unwrap_or_default();
    let records = state
        .engine
        .list_compliance_records(None)
        .map(|r| r.len())
        .unwrap_or_default();
    metrics.set_store_sizes(state.store.entry_count(), pools, records);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
