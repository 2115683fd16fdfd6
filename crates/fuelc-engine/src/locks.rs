//! # Per-Ship Ledger Locks
//!
//! Every mutating ledger operation runs while holding the ship's lock, so a
//! fresh available balance is evaluated and the resulting entry appended
//! with no other writer in between. The lock also guards the ship's cached
//! [`ShipLedger`] projection, loaded from the store on first use.
//!
//! Operations touching several ships (transfers, pool creation) acquire
//! their locks in ascending [`ShipId`] order. With a single global order two
//! opposite-direction transfers cannot deadlock.
//!
//! Acquisition waits at most the configured timeout and then fails with
//! [`EngineError::LockTimeout`]. Locks are released on every exit path,
//! including validation failures.
//!
//! ## Eviction
//!
//! One slot exists per ship seen. When an operation finishes and the number
//! of slots exceeds the configured capacity, every slot no operation holds
//! is dropped together with its cached projection; the next operation on
//! that ship reloads from the store. A slot is only removed while the map
//! shard is write-locked and nobody else holds a clone of it, so two
//! operations on one ship never end up with different mutexes.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};

use fuelc_banking::ShipLedger;
use fuelc_core::{ErrorClass, ShipId};

use crate::error::{EngineError, StoreError};

type Slot = Arc<Mutex<Option<ShipLedger>>>;

/// Registry of per-ship locks and cached ledger projections.
#[derive(Debug)]
pub struct LedgerLocks {
    slots: DashMap<ShipId, Slot>,
    timeout: Duration,
    capacity: usize,
}

impl LedgerLocks {
    pub fn new(timeout: Duration) -> Self {
        Self::with_capacity(timeout, crate::config::DEFAULT_MAX_CACHED_LEDGERS)
    }

    /// Locks that evict idle slots once more than `capacity` exist.
    pub fn with_capacity(timeout: Duration, capacity: usize) -> Self {
        Self {
            slots: DashMap::new(),
            timeout,
            capacity,
        }
    }

    /// Number of ships with a lock slot.
    pub fn cached(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, ship_id: &ShipId) -> Slot {
        Arc::clone(self.slots.entry(ship_id.clone()).or_default().value())
    }

    /// Run `f` with exclusive access to the ledgers of `ships`.
    ///
    /// `ships` must not contain duplicates. `load` builds a projection for a
    /// ship whose ledger is not cached yet. The ledgers are handed to `f` in
    /// the order of `ships`; locking happens in [`ShipId`] order. If `f`
    /// fails with an internal error the cached projections are dropped and
    /// rebuilt from the store on next use.
    pub fn with_ledgers<R>(
        &self,
        ships: &[ShipId],
        load: impl Fn(&ShipId) -> Result<ShipLedger, EngineError>,
        f: impl FnOnce(&mut [&mut ShipLedger]) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut order: Vec<usize> = (0..ships.len()).collect();
        order.sort_by(|&a, &b| ships[a].cmp(&ships[b]));

        let slots: Vec<Slot> = order.iter().map(|&i| self.slot(&ships[i])).collect();
        let mut guards: Vec<MutexGuard<'_, Option<ShipLedger>>> = Vec::with_capacity(slots.len());
        for (slot, &i) in slots.iter().zip(&order) {
            let guard = slot.try_lock_for(self.timeout).ok_or_else(|| {
                tracing::warn!(ship_id = %ships[i], timeout_ms = self.timeout_ms(), "ledger lock timeout");
                EngineError::LockTimeout {
                    ship_id: ships[i].clone(),
                    waited_ms: self.timeout_ms(),
                }
            })?;
            guards.push(guard);
        }

        for (guard, &i) in guards.iter_mut().zip(&order) {
            if guard.is_none() {
                **guard = Some(load(&ships[i])?);
            }
        }

        let result = {
            let mut by_position: Vec<Option<&mut ShipLedger>> = (0..ships.len()).map(|_| None).collect();
            for (guard, &i) in guards.iter_mut().zip(&order) {
                by_position[i] = (**guard).as_mut();
            }
            let mut ledgers: Vec<&mut ShipLedger> = by_position.into_iter().flatten().collect();
            if ledgers.len() != ships.len() {
                Err(EngineError::Store(StoreError::Unavailable(
                    "ledger projection missing after load".to_string(),
                )))
            } else {
                f(&mut ledgers)
            }
        };

        if matches!(&result, Err(e) if e.class() == ErrorClass::Internal) {
            for guard in guards.iter_mut() {
                **guard = None;
            }
        }
        drop(guards);
        drop(slots);
        if self.slots.len() > self.capacity {
            self.evict_idle();
        }
        result
    }

    /// Drop every slot that no operation currently holds.
    fn evict_idle(&self) {
        let before = self.slots.len();
        self.slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        tracing::debug!(before, after = self.slots.len(), "idle ledger slots evicted");
    }

    /// Single-ship form of [`with_ledgers`](Self::with_ledgers).
    pub fn with_ledger<R>(
        &self,
        ship_id: &ShipId,
        load: impl Fn(&ShipId) -> Result<ShipLedger, EngineError>,
        f: impl FnOnce(&mut ShipLedger) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        self.with_ledgers(std::slice::from_ref(ship_id), load, |ledgers| {
            f(&mut *ledgers[0])
        })
    }

    /// Two-ship form; `a` and `b` must differ.
    pub fn with_pair<R>(
        &self,
        a: &ShipId,
        b: &ShipId,
        load: impl Fn(&ShipId) -> Result<ShipLedger, EngineError>,
        f: impl FnOnce(&mut ShipLedger, &mut ShipLedger) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        self.with_ledgers(&[a.clone(), b.clone()], load, |ledgers| {
            let (first, second) = ledgers.split_at_mut(1);
            f(&mut *first[0], &mut *second[0])
        })
    }

    /// Drop every cached projection. The next operation reloads from the store.
    pub fn invalidate_all(&self) {
        for slot in self.slots.iter() {
            if let Some(mut guard) = slot.value().try_lock_for(self.timeout) {
                *guard = None;
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelc_core::RegulatoryParams;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ship(id: &str) -> ShipId {
        ShipId::new(id).unwrap()
    }

    fn empty(ship_id: &ShipId) -> Result<ShipLedger, EngineError> {
        Ok(ShipLedger::new(ship_id.clone(), &RegulatoryParams::default()))
    }

    #[test]
    fn ledgers_are_handed_out_in_request_order() {
        let locks = LedgerLocks::new(Duration::from_millis(100));
        let ids = [ship("Z"), ship("A"), ship("M")];
        let seen = locks
            .with_ledgers(&ids, empty, |ls| {
                Ok(ls.iter().map(|l| l.ship_id().to_string()).collect::<Vec<_>>())
            })
            .unwrap();
        assert_eq!(seen, vec!["Z", "A", "M"]);
    }

    #[test]
    fn projection_is_loaded_once() {
        let locks = LedgerLocks::new(Duration::from_millis(100));
        let loads = AtomicUsize::new(0);
        let load = |id: &ShipId| {
            loads.fetch_add(1, Ordering::SeqCst);
            empty(id)
        };
        locks.with_ledger(&ship("A"), load, |_| Ok(())).unwrap();
        locks.with_ledger(&ship("A"), load, |_| Ok(())).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        locks.invalidate_all();
        locks.with_ledger(&ship("A"), load, |_| Ok(())).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn internal_failure_drops_cached_projection() {
        let locks = LedgerLocks::new(Duration::from_millis(100));
        let loads = AtomicUsize::new(0);
        let load = |id: &ShipId| {
            loads.fetch_add(1, Ordering::SeqCst);
            empty(id)
        };
        let err = locks
            .with_ledger(&ship("A"), load, |_| -> Result<(), EngineError> {
                Err(StoreError::Unavailable("boom".into()).into())
            })
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Internal);
        locks.with_ledger(&ship("A"), load, |_| Ok(())).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn idle_slots_are_evicted_past_capacity() {
        let locks = LedgerLocks::with_capacity(Duration::from_millis(100), 2);
        for i in 0..10 {
            locks.with_ledger(&ship(&format!("S{i}")), empty, |_| Ok(())).unwrap();
            assert!(locks.cached() <= 2, "{} slots after S{i}", locks.cached());
        }
    }

    #[test]
    fn held_slot_survives_eviction() {
        let locks = LedgerLocks::with_capacity(Duration::from_millis(20), 1);
        let a = ship("A");
        locks
            .with_ledger(&a, empty, |_| {
                locks.with_ledger(&ship("B"), empty, |_| Ok(())).unwrap();
                locks.with_ledger(&ship("C"), empty, |_| Ok(())).unwrap();
                assert_eq!(locks.cached(), 1);
                // Still the same mutex: A stays locked for everyone else.
                let nested = locks.with_ledger(&a, empty, |_| Ok(()));
                assert!(matches!(nested, Err(EngineError::LockTimeout { .. })));
                Ok(())
            })
            .unwrap();
        assert_eq!(locks.cached(), 1);
    }

    #[test]
    fn held_lock_times_out() {
        let locks = LedgerLocks::new(Duration::from_millis(20));
        let a = ship("A");
        locks
            .with_ledger(&a, empty, |_| {
                let nested = locks.with_ledger(&a, empty, |_| Ok(()));
                assert!(matches!(nested, Err(EngineError::LockTimeout { .. })));
                Ok(())
            })
            .unwrap();
    }
}
