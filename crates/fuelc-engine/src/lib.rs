//! # fuelc-engine: Accounting Facade
//!
//! Executes the compliance engine's operations against a record store:
//!
//! | Operation                  | Method                                        |
//! |----------------------------|-----------------------------------------------|
//! | RecordShipYear             | [`AccountingEngine::record_ship_year`]        |
//! | GetComplianceBalance       | [`AccountingEngine::get_compliance_balance`]  |
//! | GetAdjustedPosition        | [`AccountingEngine::get_adjusted_position`]   |
//! | BankSurplus                | [`AccountingEngine::bank_surplus`]            |
//! | ApplyBankedSurplus         | [`AccountingEngine::apply_banked_surplus`]    |
//! | TransferCredits            | [`AccountingEngine::transfer_credits`]        |
//! | GetAvailableBalance        | [`AccountingEngine::get_available_balance`]   |
//! | GetLedgerSummary           | [`AccountingEngine::get_ledger_summary`]      |
//! | GetExpiringCredits         | [`AccountingEngine::get_expiring_credits`]    |
//! | ListLedgerEntries          | [`AccountingEngine::list_ledger_entries`]     |
//! | CreatePool                 | [`AccountingEngine::create_pool`]             |
//! | GetPool / ListPools        | [`AccountingEngine::get_pool`], [`AccountingEngine::list_pools`] |
//! | AddRoute / ListRoutes      | [`AccountingEngine::add_route`], [`AccountingEngine::list_routes`] |
//! | SetBaseline                | [`AccountingEngine::set_baseline`]            |
//! | CompareRoutes              | [`AccountingEngine::compare_routes`]          |
//!
//! ## Concurrency
//!
//! The calculator and allocator are pure. The only shared mutable state is
//! each ship's ledger, serialized by a per-ship lock (`locks.rs`) with a
//! bounded wait. Multi-ship operations lock in ascending ship-id order.
//! Idle lock slots are dropped once more than
//! [`EngineConfig::max_cached_ledgers`] are cached.
//!
//! ## Crate Policy
//!
//! - Storage is reached only through the [`ComplianceStore`],
//!   [`LedgerStore`], [`PoolStore`] and [`RouteStore`] traits.
//! - The current compliance year comes from an injected [`ComplianceClock`].

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod store;

pub use clock::{ComplianceClock, FixedClock, SystemClock};
pub use config::{EngineConfig, DEFAULT_LOCK_TIMEOUT, DEFAULT_MAX_CACHED_LEDGERS};
pub use engine::{AccountingEngine, AdjustedPosition, PoolMemberRequest};
pub use error::{EngineError, StoreError};
pub use locks::LedgerLocks;
pub use store::{ComplianceStore, LedgerStore, MemoryStore, PoolStore, RouteStore};
