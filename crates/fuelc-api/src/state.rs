//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The accounting engine runs against an in-memory [`MemoryStore`]. When a
//! PostgreSQL pool is configured, handlers write the rows produced by each
//! successful operation through to the database, and [`AppState::hydrate_from_db`]
//! reloads the store on startup.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use fuelc_compliance::TargetSchedule;
use fuelc_core::{ComplianceYear, ShipId};
use fuelc_engine::{
    AccountingEngine, ComplianceClock, EngineConfig, FixedClock, MemoryStore, SystemClock,
    DEFAULT_LOCK_TIMEOUT,
};

use crate::error::AppError;

// -- Configuration ------------------------------------------------------------

/// Server configuration, read from the environment by [`AppConfig::from_env`].
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to (`PORT`, default 8080).
    pub port: u16,
    /// PostgreSQL connection string (`DATABASE_URL`). `None` means in-memory only.
    pub database_url: Option<String>,
    /// Per-ship ledger lock wait (`FUELC_LOCK_TIMEOUT_MS`).
    pub lock_timeout: Duration,
    /// Pins the compliance clock (`FUELC_COMPLIANCE_YEAR`). `None` follows
    /// the UTC calendar year.
    pub compliance_year: Option<ComplianceYear>,
    /// Target intensity schedule (`FUELC_TARGET_SCHEDULE`, `ANCHORS-V0` or
    /// `FUELEU-2023`). Defaults to the anchor-only schedule.
    pub schedule: TargetSchedule,
    /// Emit JSON log lines (`FUELC_LOG_JSON=1`).
    pub log_json: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("lock_timeout", &self.lock_timeout)
            .field("compliance_year", &self.compliance_year)
            .field("schedule", &self.schedule.version())
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            compliance_year: None,
            schedule: TargetSchedule::default(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Lock wait in whole milliseconds, saturating for absurd durations.
    pub fn lock_timeout_ms(&self) -> u64 {
        u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .map_err(|_| format!("PORT must be a port number, got {port:?}"))?;
        }
        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if let Some(ms) = lookup("FUELC_LOCK_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| format!("FUELC_LOCK_TIMEOUT_MS must be milliseconds, got {ms:?}"))?;
            config.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(year) = lookup("FUELC_COMPLIANCE_YEAR") {
            let parsed: i64 = year
                .parse()
                .map_err(|_| format!("FUELC_COMPLIANCE_YEAR must be a year, got {year:?}"))?;
            config.compliance_year =
                Some(ComplianceYear::new(parsed).map_err(|e| format!("FUELC_COMPLIANCE_YEAR: {e}"))?);
        }
        if let Some(version) = lookup("FUELC_TARGET_SCHEDULE") {
            config.schedule = TargetSchedule::from_version(&version)
                .map_err(|e| format!("FUELC_TARGET_SCHEDULE: {e}"))?;
        }
        config.log_json = lookup("FUELC_LOG_JSON").is_some_and(|v| v == "1" || v == "true");
        Ok(config)
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The accounting facade every route delegates to.
    pub engine: Arc<AccountingEngine>,
    /// Backing store of the engine; hydrated from the database on startup.
    pub store: Arc<MemoryStore>,
    /// PostgreSQL pool for write-through persistence. `None` in
    /// in-memory-only mode.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State for `config`. The compliance clock is pinned when
    /// `config.compliance_year` is set.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let clock: Arc<dyn ComplianceClock> = match config.compliance_year {
            Some(year) => Arc::new(FixedClock::new(year)),
            None => Arc::new(SystemClock),
        };
        Self::with_clock(config, clock, db_pool)
    }

    /// State with an explicit compliance clock.
    pub fn with_clock(
        config: AppConfig,
        clock: Arc<dyn ComplianceClock>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine_config = EngineConfig {
            lock_timeout: config.lock_timeout,
            schedule: config.schedule.clone(),
            ..EngineConfig::default()
        };
        let engine = AccountingEngine::with_memory_store(engine_config, Arc::clone(&store), clock);
        Self {
            engine: Arc::new(engine),
            store,
            db_pool,
            config,
        }
    }

    /// Hydrate the in-memory store from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let records = crate::db::records::load_all(pool)
            .await
            .map_err(|e| format!("failed to load compliance records: {e}"))?;
        let record_count = records.len();
        self.store.restore_records(records);

        let entries = crate::db::ledger::load_all(pool)
            .await
            .map_err(|e| format!("failed to load ledger entries: {e}"))?;
        let entry_count = entries.len();
        self.store.restore_entries(entries);

        let pools = crate::db::pools::load_all(pool)
            .await
            .map_err(|e| format!("failed to load pools: {e}"))?;
        let pool_count = pools.len();
        self.store.restore_pools(pools);

        let routes = crate::db::routes::load_all(pool)
            .await
            .map_err(|e| format!("failed to load routes: {e}"))?;
        let route_count = routes.len();
        self.store.restore_routes(routes);

        self.engine.invalidate_cache();

        tracing::info!(
            compliance_records = record_count,
            ledger_entries = entry_count,
            pools = pool_count,
            routes = route_count,
            "Hydrated in-memory store from database"
        );
        Ok(())
    }

    /// Write the ledgers of `ships` through to the database in one
    /// transaction.
    ///
    /// Entries already persisted are skipped, so this also picks up expiry
    /// entries appended as a side effect of the operation.
    pub async fn persist_ledgers(&self, ships: &[ShipId]) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        let mut entries = Vec::new();
        for ship_id in ships {
            entries.extend(self.engine.list_ledger_entries(ship_id, None)?);
        }
        if let Err(e) = crate::db::ledger::insert_missing(pool, ships, &entries).await {
            tracing::error!(ships = ?ships, error = %e, "failed to persist ledger entries");
            return Err(AppError::Internal(
                "ledger updated in-memory but database persist failed".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
