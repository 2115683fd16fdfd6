//! # Record Store
//!
//! The engine's only external collaborator, split into one trait per
//! concern so backends can be mixed and test doubles stay small:
//!
//! - [`ComplianceStore`]: compliance records keyed by `(ship, year)`.
//! - [`LedgerStore`]: append-only ledger entries per ship. A batch append is
//!   all-or-nothing, which is what makes a transfer atomic.
//! - [`PoolStore`]: allocated pools.
//! - [`RouteStore`]: the route catalogue and its single baseline.
//!
//! [`MemoryStore`] implements all four behind `parking_lot` locks. It is
//! never held across an `.await`; callers on an async runtime may use it
//! directly.

use std::collections::HashMap;

use parking_lot::RwLock;

use fuelc_banking::LedgerEntry;
use fuelc_compliance::{ComplianceRecord, Route, RouteFilter};
use fuelc_core::{ComplianceYear, PoolId, RouteId, ShipId, Timestamp};
use fuelc_pooling::Pool;

use crate::error::StoreError;

/// Per-ship-year compliance record lookup and upsert.
pub trait ComplianceStore: Send + Sync {
    fn get_record(
        &self,
        ship_id: &ShipId,
        year: ComplianceYear,
    ) -> Result<Option<ComplianceRecord>, StoreError>;

    /// Insert or replace the record for `(record.ship_id, record.year)`.
    fn upsert_record(&self, record: &ComplianceRecord) -> Result<(), StoreError>;

    /// Records of one ship (or all ships), ordered by ship then year.
    fn list_records(&self, ship_id: Option<&ShipId>) -> Result<Vec<ComplianceRecord>, StoreError>;
}

/// Append-only per-ship ledger log.
pub trait LedgerStore: Send + Sync {
    /// All entries of `ship_id` in append order.
    fn entries(&self, ship_id: &ShipId) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Append a batch, possibly spanning several ships. Either every entry
    /// is persisted or none is.
    fn append(&self, entries: &[LedgerEntry]) -> Result<(), StoreError>;
}

/// Pool persistence.
pub trait PoolStore: Send + Sync {
    fn insert_pool(&self, pool: &Pool) -> Result<(), StoreError>;

    fn get_pool(&self, pool_id: &PoolId) -> Result<Option<Pool>, StoreError>;

    /// Pools in creation order, optionally restricted to one year.
    fn list_pools(&self, year: Option<ComplianceYear>) -> Result<Vec<Pool>, StoreError>;

    /// The pool `ship_id` belongs to in `year`, if any.
    fn pool_for(&self, ship_id: &ShipId, year: ComplianceYear) -> Result<Option<Pool>, StoreError>;
}

/// Route catalogue persistence.
pub trait RouteStore: Send + Sync {
    /// Add a route. A second route with the same id is a `Conflict`.
    fn insert_route(&self, route: &Route) -> Result<(), StoreError>;

    fn get_route(&self, route_id: &RouteId) -> Result<Option<Route>, StoreError>;

    /// Matching routes in insertion order.
    fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>, StoreError>;

    fn baseline(&self) -> Result<Option<Route>, StoreError>;

    /// Make `route_id` the only baseline, clearing the flag on any other
    /// route in the same write. `None` if the route does not exist, in which
    /// case nothing changes.
    fn set_baseline(&self, route_id: &RouteId, at: Timestamp) -> Result<Option<Route>, StoreError>;
}

// ── In-memory implementation ───────────────────────────────────────────

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(ShipId, ComplianceYear), ComplianceRecord>>,
    ledgers: RwLock<HashMap<ShipId, Vec<LedgerEntry>>>,
    pools: RwLock<Vec<Pool>>,
    routes: RwLock<Vec<Route>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load persisted compliance records, replacing any with the same key.
    pub fn restore_records(&self, records: impl IntoIterator<Item = ComplianceRecord>) {
        let mut guard = self.records.write();
        for record in records {
            guard.insert((record.ship_id.clone(), record.year), record);
        }
    }

    /// Load persisted ledger entries. Must be given in append order.
    pub fn restore_entries(&self, entries: impl IntoIterator<Item = LedgerEntry>) {
        let mut guard = self.ledgers.write();
        for entry in entries {
            guard.entry(entry.ship_id.clone()).or_default().push(entry);
        }
    }

    /// Load persisted pools in creation order.
    pub fn restore_pools(&self, pools: impl IntoIterator<Item = Pool>) {
        self.pools.write().extend(pools);
    }

    /// Load persisted routes in insertion order, replacing any with the same id.
    pub fn restore_routes(&self, routes: impl IntoIterator<Item = Route>) {
        let mut guard = self.routes.write();
        for route in routes {
            match guard.iter_mut().find(|r| r.route_id == route.route_id) {
                Some(existing) => *existing = route,
                None => guard.push(route),
            }
        }
    }

    /// Total number of ledger entries across all ships.
    pub fn entry_count(&self) -> usize {
        self.ledgers.read().values().map(Vec::len).sum()
    }
}

impl ComplianceStore for MemoryStore {
    fn get_record(
        &self,
        ship_id: &ShipId,
        year: ComplianceYear,
    ) -> Result<Option<ComplianceRecord>, StoreError> {
        Ok(self.records.read().get(&(ship_id.clone(), year)).cloned())
    }

    fn upsert_record(&self, record: &ComplianceRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .insert((record.ship_id.clone(), record.year), record.clone());
        Ok(())
    }

    fn list_records(&self, ship_id: Option<&ShipId>) -> Result<Vec<ComplianceRecord>, StoreError> {
        let mut records: Vec<ComplianceRecord> = self
            .records
            .read()
            .values()
            .filter(|r| ship_id.map_or(true, |s| &r.ship_id == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| (&a.ship_id, a.year).cmp(&(&b.ship_id, b.year)));
        Ok(records)
    }
}

impl LedgerStore for MemoryStore {
    fn entries(&self, ship_id: &ShipId) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self.ledgers.read().get(ship_id).cloned().unwrap_or_default())
    }

    fn append(&self, entries: &[LedgerEntry]) -> Result<(), StoreError> {
        let mut guard = self.ledgers.write();
        for entry in entries {
            let duplicate = guard
                .get(&entry.ship_id)
                .is_some_and(|log| log.iter().any(|e| e.id == entry.id));
            if duplicate {
                return Err(StoreError::Conflict(format!("{} already appended", entry.id)));
            }
        }
        for entry in entries {
            guard.entry(entry.ship_id.clone()).or_default().push(entry.clone());
        }
        Ok(())
    }
}

impl PoolStore for MemoryStore {
    fn insert_pool(&self, pool: &Pool) -> Result<(), StoreError> {
        let mut guard = self.pools.write();
        if guard.iter().any(|p| p.id == pool.id) {
            return Err(StoreError::Conflict(format!("{} already exists", pool.id)));
        }
        guard.push(pool.clone());
        Ok(())
    }

    fn get_pool(&self, pool_id: &PoolId) -> Result<Option<Pool>, StoreError> {
        Ok(self.pools.read().iter().find(|p| &p.id == pool_id).cloned())
    }

    fn list_pools(&self, year: Option<ComplianceYear>) -> Result<Vec<Pool>, StoreError> {
        Ok(self
            .pools
            .read()
            .iter()
            .filter(|p| year.map_or(true, |y| p.year == y))
            .cloned()
            .collect())
    }

    fn pool_for(&self, ship_id: &ShipId, year: ComplianceYear) -> Result<Option<Pool>, StoreError> {
        Ok(self
            .pools
            .read()
            .iter()
            .find(|p| p.year == year && p.contains(ship_id))
            .cloned())
    }
}

impl RouteStore for MemoryStore {
    fn insert_route(&self, route: &Route) -> Result<(), StoreError> {
        let mut guard = self.routes.write();
        if guard.iter().any(|r| r.route_id == route.route_id) {
            return Err(StoreError::Conflict(format!("route {} already exists", route.route_id)));
        }
        guard.push(route.clone());
        Ok(())
    }

    fn get_route(&self, route_id: &RouteId) -> Result<Option<Route>, StoreError> {
        Ok(self.routes.read().iter().find(|r| &r.route_id == route_id).cloned())
    }

    fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>, StoreError> {
        Ok(self
            .routes
            .read()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn baseline(&self) -> Result<Option<Route>, StoreError> {
        Ok(self.routes.read().iter().find(|r| r.is_baseline).cloned())
    }

    fn set_baseline(&self, route_id: &RouteId, at: Timestamp) -> Result<Option<Route>, StoreError> {
        let mut guard = self.routes.write();
        if !guard.iter().any(|r| &r.route_id == route_id) {
            return Ok(None);
        }
        let mut selected = None;
        for route in guard.iter_mut() {
            let is_target = &route.route_id == route_id;
            if route.is_baseline != is_target {
                route.is_baseline = is_target;
                route.updated_at = at;
            }
            if is_target {
                selected = Some(route.clone());
            }
        }
        Ok(selected)
    }
}
