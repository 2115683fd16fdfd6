//! # Accounting Facade
//!
//! [`AccountingEngine`] composes the calculator, the per-ship ledgers and
//! the pooling allocator into the operation set exposed to callers, and
//! executes each operation against the injected stores.
//!
//! ## Write discipline
//!
//! Every ledger mutation follows the same sequence under the ship's lock:
//!
//! 1. sweep credits expired as of the current compliance year (persisted
//!    as `Expired` entries);
//! 2. validate the request against the fresh projection (`prepare_*`);
//! 3. append the resulting entries to the store in one batch;
//! 4. apply them to the cached projection.
//!
//! A store failure at step 3 leaves both the store and the projection as
//! they were.
//!
//! ## Adjusted position
//!
//! ```text
//! adjusted_cb = raw_cb − banked_from(year) + applied_to(year) + pool_delta(year)
//! ```
//!
//! Banking and pooling read the same figure, so a surplus moved into a pool
//! is no longer bankable and a banked surplus is no longer poolable.
//!
//! Every pool member must have a compliance record for the pool year, and
//! its `cb_before` is always the engine's own adjusted figure. The banking
//! rules see the pool delta only through a clamp: the bankable base never
//! exceeds the raw surplus and the coverable deficit never exceeds the raw
//! deficit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fuelc_banking::{ActiveCredit, LedgerEntry, LedgerError, LedgerSummary, ShipLedger};
use fuelc_compliance::{
    compare_intensity, compare_routes, ComplianceCalculator, ComplianceRecord, IntensityComparison,
    NewRoute, RawShipYearMetrics, Route, RouteComparison, RouteFilter,
};
use fuelc_core::{CbAmount, ComplianceYear, PoolId, RegulatoryParams, RouteId, ShipId};
use fuelc_pooling::{allocate, Pool, PoolError, PoolMemberInput};

use crate::clock::ComplianceClock;
use crate::config::EngineConfig;
use crate::error::{EngineError, StoreError};
use crate::locks::LedgerLocks;
use crate::store::{ComplianceStore, LedgerStore, MemoryStore, PoolStore, RouteStore};

/// A ship's compliance position for one year after banking and pooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPosition {
    pub ship_id: ShipId,
    pub year: ComplianceYear,
    /// Compliance balance from the calculator.
    pub raw_cb: CbAmount,
    /// Own surplus banked from this year.
    pub banked: CbAmount,
    /// Banked credits applied to this year's deficit.
    pub applied: CbAmount,
    /// `cb_after − cb_before` of the ship's pool for this year.
    pub pool_delta: CbAmount,
    pub pool_id: Option<PoolId>,
    pub adjusted_cb: CbAmount,
}

/// A requested pool member. The member's adjusted compliance balance for
/// the pool year is always used; a `cb_before` given here must equal it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolMemberRequest {
    pub ship_id: ShipId,
    #[serde(default)]
    pub cb_before: Option<CbAmount>,
}

/// The Accounting Facade.
pub struct AccountingEngine {
    config: EngineConfig,
    calculator: ComplianceCalculator,
    records: Arc<dyn ComplianceStore>,
    ledger: Arc<dyn LedgerStore>,
    pools: Arc<dyn PoolStore>,
    routes: Arc<dyn RouteStore>,
    clock: Arc<dyn ComplianceClock>,
    locks: LedgerLocks,
}

impl std::fmt::Debug for AccountingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountingEngine")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl AccountingEngine {
    pub fn new(
        config: EngineConfig,
        records: Arc<dyn ComplianceStore>,
        ledger: Arc<dyn LedgerStore>,
        pools: Arc<dyn PoolStore>,
        routes: Arc<dyn RouteStore>,
        clock: Arc<dyn ComplianceClock>,
    ) -> Self {
        let calculator = ComplianceCalculator::new(config.schedule.clone(), &config.params);
        let locks = LedgerLocks::with_capacity(config.lock_timeout, config.max_cached_ledgers);
        Self {
            config,
            calculator,
            records,
            ledger,
            pools,
            routes,
            clock,
            locks,
        }
    }

    /// An engine backed entirely by one [`MemoryStore`].
    pub fn with_memory_store(
        config: EngineConfig,
        store: Arc<MemoryStore>,
        clock: Arc<dyn ComplianceClock>,
    ) -> Self {
        Self::new(config, store.clone(), store.clone(), store.clone(), store, clock)
    }

    pub fn params(&self) -> &RegulatoryParams {
        &self.config.params
    }

    pub fn calculator(&self) -> &ComplianceCalculator {
        &self.calculator
    }

    pub fn current_year(&self) -> Result<ComplianceYear, EngineError> {
        Ok(self.clock.current_year()?)
    }

    /// Drop cached ledger projections, e.g. after the store was hydrated.
    pub fn invalidate_cache(&self) {
        self.locks.invalidate_all();
    }

    // ── Compliance ─────────────────────────────────────────────────────

    /// Compute and store the compliance record for a ship-year, replacing
    /// any previous record for the same key.
    pub fn record_ship_year(&self, metrics: &RawShipYearMetrics) -> Result<ComplianceRecord, EngineError> {
        let record = self.calculator.compute(metrics)?;
        self.records.upsert_record(&record)?;
        tracing::info!(
            ship_id = %record.ship_id,
            year = %record.year,
            cb = %record.cb,
            "compliance record stored"
        );
        Ok(record)
    }

    pub fn get_compliance_balance(
        &self,
        ship_id: &ShipId,
        year: ComplianceYear,
    ) -> Result<ComplianceRecord, EngineError> {
        self.records
            .get_record(ship_id, year)?
            .ok_or_else(|| EngineError::RecordNotFound {
                ship_id: ship_id.clone(),
                year,
            })
    }

    pub fn list_compliance_records(
        &self,
        ship_id: Option<&ShipId>,
    ) -> Result<Vec<ComplianceRecord>, EngineError> {
        Ok(self.records.list_records(ship_id)?)
    }

    /// Compare an intensity against a baseline and the year's target.
    pub fn compare_intensity(
        &self,
        year: ComplianceYear,
        baseline: f64,
        comparison: f64,
    ) -> Result<IntensityComparison, EngineError> {
        Ok(compare_intensity(self.calculator.schedule(), year, baseline, comparison)?)
    }

    /// Raw compliance balance adjusted for banking and pooling.
    pub fn get_adjusted_position(
        &self,
        ship_id: &ShipId,
        year: ComplianceYear,
    ) -> Result<AdjustedPosition, EngineError> {
        let record = self.get_compliance_balance(ship_id, year)?;
        self.locks
            .with_ledger(ship_id, |s| self.load_ledger(s), |ledger| self.position(ledger, &record))
    }

    // ── Banking ────────────────────────────────────────────────────────

    /// Bank part of the surplus of `year`.
    pub fn bank_surplus(
        &self,
        ship_id: &ShipId,
        year: ComplianceYear,
        amount: CbAmount,
    ) -> Result<LedgerEntry, EngineError> {
        let as_of = self.clock.current_year()?;
        let record = self.get_compliance_balance(ship_id, year)?;
        let result = self.locks.with_ledger(
            ship_id,
            |s| self.load_ledger(s),
            |ledger| {
                self.sweep_expired(ledger, as_of)?;
                let (pool_delta, _) = self.pool_delta(ship_id, year)?;
                let base = (record.cb + pool_delta).min(record.cb);
                let entry = ledger.prepare_deposit(year, amount, base, as_of, self.clock.now())?;
                self.commit(&mut [&mut *ledger], vec![entry.clone()])?;
                Ok(entry)
            },
        );
        log_outcome("bank_surplus", ship_id, amount, &result);
        result
    }

    /// Apply banked credits to the deficit of `year`, oldest credits first.
    pub fn apply_banked_surplus(
        &self,
        ship_id: &ShipId,
        year: ComplianceYear,
        amount: CbAmount,
    ) -> Result<LedgerEntry, EngineError> {
        let as_of = self.clock.current_year()?;
        let record = self.get_compliance_balance(ship_id, year)?;
        let result = self.locks.with_ledger(
            ship_id,
            |s| self.load_ledger(s),
            |ledger| {
                self.sweep_expired(ledger, as_of)?;
                let (pool_delta, _) = self.pool_delta(ship_id, year)?;
                let base = (record.cb + pool_delta).max(record.cb);
                let entry = ledger.prepare_withdrawal(year, amount, base, as_of, self.clock.now())?;
                self.commit(&mut [&mut *ledger], vec![entry.clone()])?;
                Ok(entry)
            },
        );
        log_outcome("apply_banked_surplus", ship_id, amount, &result);
        result
    }

    /// Move banked credits to another ship. Returns the sender's entry.
    ///
    /// The sender's `Transfer` entry and the receiver's deposits are
    /// appended in one batch: both persist or neither does.
    pub fn transfer_credits(
        &self,
        from: &ShipId,
        to: &ShipId,
        amount: CbAmount,
    ) -> Result<LedgerEntry, EngineError> {
        if from == to {
            return Err(LedgerError::SameShipTransfer {
                ship_id: from.clone(),
            }
            .into());
        }
        let as_of = self.clock.current_year()?;
        let result = self.locks.with_pair(
            from,
            to,
            |s| self.load_ledger(s),
            |sender, receiver| {
                self.sweep_expired(sender, as_of)?;
                self.sweep_expired(receiver, as_of)?;
                let plan = sender.prepare_transfer(to, amount, as_of, self.clock.now())?;
                let outgoing = plan.outgoing.clone();
                let mut batch = Vec::with_capacity(1 + plan.incoming.len());
                batch.push(plan.outgoing);
                batch.extend(plan.incoming);
                self.commit(&mut [&mut *sender, &mut *receiver], batch)?;
                Ok(outgoing)
            },
        );
        log_outcome("transfer_credits", from, amount, &result);
        result
    }

    /// Sum of the ship's non-expired banked credits.
    pub fn get_available_balance(&self, ship_id: &ShipId) -> Result<CbAmount, EngineError> {
        let as_of = self.clock.current_year()?;
        self.locks.with_ledger(
            ship_id,
            |s| self.load_ledger(s),
            |ledger| {
                self.sweep_expired(ledger, as_of)?;
                Ok(ledger.available_balance(as_of))
            },
        )
    }

    /// Credits that lapse within `within_years` compliance years, the
    /// current one included.
    pub fn get_expiring_credits(
        &self,
        ship_id: &ShipId,
        within_years: u16,
    ) -> Result<Vec<ActiveCredit>, EngineError> {
        let as_of = self.clock.current_year()?;
        self.locks.with_ledger(
            ship_id,
            |s| self.load_ledger(s),
            |ledger| {
                self.sweep_expired(ledger, as_of)?;
                Ok(ledger.expiring_credits(as_of, within_years))
            },
        )
    }

    pub fn get_ledger_summary(&self, ship_id: &ShipId) -> Result<LedgerSummary, EngineError> {
        let as_of = self.clock.current_year()?;
        self.locks.with_ledger(
            ship_id,
            |s| self.load_ledger(s),
            |ledger| {
                self.sweep_expired(ledger, as_of)?;
                Ok(ledger.summary(as_of))
            },
        )
    }

    /// Persisted entries in append order, optionally for one `year` only.
    pub fn list_ledger_entries(
        &self,
        ship_id: &ShipId,
        year: Option<ComplianceYear>,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        let mut entries = self.ledger.entries(ship_id)?;
        if let Some(year) = year {
            entries.retain(|e| e.year == year);
        }
        Ok(entries)
    }

    // ── Pooling ────────────────────────────────────────────────────────

    /// Allocate and store a pool for `year`.
    ///
    /// All member ledgers are locked for the duration, so the `cb_before`
    /// snapshots are mutually consistent and no member can join a second
    /// pool for the same year concurrently. Each member needs a compliance
    /// record for `year`.
    pub fn create_pool(
        &self,
        year: ComplianceYear,
        members: &[PoolMemberRequest],
    ) -> Result<Pool, EngineError> {
        let params = &self.config.params;
        if members.len() < params.min_pool_size || members.len() > params.max_pool_size {
            return Err(PoolError::InvalidPoolSize {
                size: members.len(),
                min: params.min_pool_size,
                max: params.max_pool_size,
            }
            .into());
        }
        let ships: Vec<ShipId> = members.iter().map(|m| m.ship_id.clone()).collect();
        let mut sorted = ships.clone();
        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(PoolError::DuplicateMember {
                ship_id: pair[0].clone(),
            }
            .into());
        }

        let result = self.locks.with_ledgers(
            &ships,
            |s| self.load_ledger(s),
            |ledgers| {
                let mut inputs = Vec::with_capacity(members.len());
                for (request, ledger) in members.iter().zip(ledgers.iter()) {
                    if let Some(existing) = self.pools.pool_for(&request.ship_id, year)? {
                        return Err(EngineError::AlreadyPooled {
                            ship_id: request.ship_id.clone(),
                            year,
                            pool_id: existing.id,
                        });
                    }
                    let record = self.get_compliance_balance(&request.ship_id, year)?;
                    let cb_before = self.position(ledger, &record)?.adjusted_cb;
                    if let Some(claimed) = request.cb_before.filter(|c| *c != cb_before) {
                        return Err(EngineError::CbBeforeMismatch {
                            ship_id: request.ship_id.clone(),
                            year,
                            claimed,
                            actual: cb_before,
                        });
                    }
                    inputs.push(PoolMemberInput {
                        ship_id: request.ship_id.clone(),
                        cb_before,
                    });
                }
                let allocated = allocate(&inputs, params)?;
                let pool = Pool::new(year, allocated, self.clock.now());
                self.pools.insert_pool(&pool)?;
                Ok(pool)
            },
        );

        match &result {
            Ok(pool) => tracing::info!(
                pool_id = %pool.id,
                year = %year,
                members = pool.members.len(),
                total = %pool.total(),
                "pool created"
            ),
            Err(e) => tracing::warn!(year = %year, code = e.code(), error = %e, "pool rejected"),
        }
        result
    }

    pub fn get_pool(&self, pool_id: &PoolId) -> Result<Pool, EngineError> {
        self.pools
            .get_pool(pool_id)?
            .ok_or(EngineError::PoolNotFound { pool_id: *pool_id })
    }

    pub fn list_pools(&self, year: Option<ComplianceYear>) -> Result<Vec<Pool>, EngineError> {
        Ok(self.pools.list_pools(year)?)
    }

    // ── Routes ─────────────────────────────────────────────────────────

    /// Add a route to the catalogue. Route ids are unique.
    pub fn add_route(&self, new: NewRoute) -> Result<Route, EngineError> {
        let route = Route::create(new, self.clock.now())?;
        match self.routes.insert_route(&route) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(EngineError::DuplicateRoute {
                    route_id: route.route_id,
                })
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(
            route_id = %route.route_id,
            vessel_type = %route.vessel_type,
            fuel_type = %route.fuel_type,
            year = %route.year,
            "route added"
        );
        Ok(route)
    }

    pub fn get_route(&self, route_id: &RouteId) -> Result<Route, EngineError> {
        self.routes
            .get_route(route_id)?
            .ok_or_else(|| EngineError::RouteNotFound {
                route_id: route_id.clone(),
            })
    }

    pub fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>, EngineError> {
        Ok(self.routes.list_routes(filter)?)
    }

    /// Make `route_id` the catalogue's only baseline.
    pub fn set_baseline(&self, route_id: &RouteId) -> Result<Route, EngineError> {
        let route = self
            .routes
            .set_baseline(route_id, self.clock.now())?
            .ok_or_else(|| EngineError::RouteNotFound {
                route_id: route_id.clone(),
            })?;
        tracing::info!(route_id = %route_id, "baseline route set");
        Ok(route)
    }

    /// Every non-baseline route rated against the baseline and against the
    /// target intensity of `target_year`.
    pub fn compare_routes(&self, target_year: ComplianceYear) -> Result<Vec<RouteComparison>, EngineError> {
        let baseline = self.routes.baseline()?.ok_or(EngineError::BaselineNotSet)?;
        let routes = self.routes.list_routes(&RouteFilter::default())?;
        Ok(compare_routes(self.calculator.schedule(), &baseline, &routes, target_year)?)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn load_ledger(&self, ship_id: &ShipId) -> Result<ShipLedger, EngineError> {
        let entries = self.ledger.entries(ship_id)?;
        let ledger = ShipLedger::replay(ship_id.clone(), &self.config.params, entries)?;
        tracing::debug!(ship_id = %ship_id, entries = ledger.entries().len(), "ledger loaded");
        Ok(ledger)
    }

    fn pool_delta(
        &self,
        ship_id: &ShipId,
        year: ComplianceYear,
    ) -> Result<(CbAmount, Option<PoolId>), EngineError> {
        let pool = self.pools.pool_for(ship_id, year)?;
        Ok(pool
            .and_then(|p| p.member(ship_id).map(|m| (m.delta(), Some(p.id))))
            .unwrap_or((CbAmount::ZERO, None)))
    }

    fn position(
        &self,
        ledger: &ShipLedger,
        record: &ComplianceRecord,
    ) -> Result<AdjustedPosition, EngineError> {
        let (pool_delta, pool_id) = self.pool_delta(&record.ship_id, record.year)?;
        let banked = ledger.banked_from(record.year);
        let applied = ledger.applied_to(record.year);
        Ok(AdjustedPosition {
            ship_id: record.ship_id.clone(),
            year: record.year,
            raw_cb: record.cb,
            banked,
            applied,
            pool_delta,
            pool_id,
            adjusted_cb: record.cb - banked + applied + pool_delta,
        })
    }

    fn sweep_expired(&self, ledger: &mut ShipLedger, as_of: ComplianceYear) -> Result<(), EngineError> {
        let sweep = ledger.expired_sweep(as_of, self.clock.now());
        if sweep.is_empty() {
            return Ok(());
        }
        let swept: CbAmount = sweep.iter().map(LedgerEntry::magnitude).sum();
        self.commit(&mut [&mut *ledger], sweep)?;
        tracing::info!(ship_id = %ledger.ship_id(), as_of = %as_of, expired = %swept, "expired credits swept");
        Ok(())
    }

    /// Persist `batch`, then apply each entry to the ledger of its ship.
    fn commit(&self, ledgers: &mut [&mut ShipLedger], batch: Vec<LedgerEntry>) -> Result<(), EngineError> {
        if let Err(e) = self.ledger.append(&batch) {
            tracing::error!(error = %e, entries = batch.len(), "ledger append failed");
            return Err(e.into());
        }
        for entry in batch {
            let ledger = ledgers
                .iter_mut()
                .find(|l| l.ship_id() == &entry.ship_id)
                .ok_or_else(|| LedgerError::CorruptHistory {
                    ship_id: entry.ship_id.clone(),
                    detail: format!("entry {} committed without its ledger locked", entry.id),
                })?;
            ledger.apply(entry)?;
        }
        Ok(())
    }
}

fn log_outcome(op: &'static str, ship_id: &ShipId, amount: CbAmount, result: &Result<LedgerEntry, EngineError>) {
    match result {
        Ok(entry) => tracing::info!(
            op,
            ship_id = %ship_id,
            year = %entry.year,
            amount = %amount,
            entry_id = %entry.id,
            "ledger entry appended"
        ),
        Err(e) if e.class().is_retryable() => {
            tracing::warn!(op, ship_id = %ship_id, amount = %amount, error = %e, "ledger operation timed out")
        }
        Err(e) => tracing::debug!(op, ship_id = %ship_id, amount = %amount, code = e.code(), error = %e, "ledger operation rejected"),
    }
}
