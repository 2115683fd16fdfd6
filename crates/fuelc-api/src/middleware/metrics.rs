//! # Prometheus Metrics
//!
//! HTTP request counters and latency are recorded in middleware. Store
//! gauges (ledger entries, pools, records) are refreshed on each `/metrics`
//! scrape; see the handler in `lib.rs`.
//!
//! The `path` label is the matched route template (`/v1/banking/:ship_id/balance`),
//! never the raw URI, so ship ids do not become label values.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    lock_timeouts_total: IntCounter,

    ledger_entries: Gauge,
    pools: Gauge,
    compliance_records: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create the metric families and register them in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("fuelc_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "fuelc_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("fuelc_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;
        let lock_timeouts_total = IntCounter::new(
            "fuelc_ledger_lock_timeouts_total",
            "Requests rejected because a ship ledger lock was not acquired in time",
        )?;
        let ledger_entries = Gauge::new("fuelc_ledger_entries", "Ledger entries across all ships")?;
        let pools = Gauge::new("fuelc_pools", "Pools stored")?;
        let compliance_records =
            Gauge::new("fuelc_compliance_records", "Compliance records stored")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(lock_timeouts_total.clone()))?;
        registry.register(Box::new(ledger_entries.clone()))?;
        registry.register(Box::new(pools.clone()))?;
        registry.register(Box::new(compliance_records.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                lock_timeouts_total,
                ledger_entries,
                pools,
                compliance_records,
            }),
        })
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total 4xx/5xx count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    pub fn lock_timeouts(&self) -> u64 {
        self.inner.lock_timeouts_total.get()
    }

    fn record_request(&self, method: &str, path: &str, status: StatusCode, duration_secs: f64) {
        let status_str = status.as_u16().to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status.is_client_error() || status.is_server_error() {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            self.inner.lock_timeouts_total.inc();
        }
    }

    /// Refresh the store gauges before a scrape.
    pub fn set_store_sizes(&self, ledger_entries: usize, pools: usize, compliance_records: usize) {
        self.inner.ledger_entries.set(ledger_entries as f64);
        self.inner.pools.set(pools as f64);
        self.inner.compliance_records.set(compliance_records as f64);
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records request count, latency and errors.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(&method, &path, response.status(), start.elapsed().as_secs_f64());
    }

    response
}
