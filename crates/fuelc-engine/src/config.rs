//! Engine configuration.

use std::time::Duration;

use fuelc_compliance::TargetSchedule;
use fuelc_core::RegulatoryParams;

/// Default wait for a per-ship ledger lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of ship ledgers kept cached before idle ones are evicted.
pub const DEFAULT_MAX_CACHED_LEDGERS: usize = 10_000;

/// Tunables of an [`AccountingEngine`](crate::AccountingEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub params: RegulatoryParams,
    pub schedule: TargetSchedule,
    /// How long an operation waits for a ship's ledger lock before failing
    /// with `LockTimeout`.
    pub lock_timeout: Duration,
    /// Idle per-ship lock slots (and their cached projections) are evicted
    /// once more than this many exist.
    pub max_cached_ledgers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            params: RegulatoryParams::default(),
            schedule: TargetSchedule::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_cached_ledgers: DEFAULT_MAX_CACHED_LEDGERS,
        }
    }
}
