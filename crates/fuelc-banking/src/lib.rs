//! # fuelc-banking: Banking Ledger
//!
//! Ships may carry a capped share of a surplus year forward and later apply
//! it to a deficit year, or hand it to another ship. This crate holds the
//! per-ship bookkeeping for that:
//!
//! - **Entries** (`entry.rs`): the append-only [`LedgerEntry`] and the
//!   explicit [`EntryKind`] tag. Entries are never mutated; reversals and
//!   expiry are new entries.
//!
//! - **Ledger** (`ledger.rs`): [`ShipLedger`], an incrementally maintained
//!   projection (balance, FIFO active-credit queue, per-year totals) that
//!   can be rebuilt from entries at any time. Validation of deposits,
//!   withdrawals and transfers happens here.
//!
//! ## Crate Policy
//!
//! - Pure bookkeeping. Serialization of operations on one ship (locking)
//!   and persistence belong to `fuelc-engine`.
//! - The current compliance year is always an explicit argument; nothing
//!   here reads a clock.

pub mod entry;
pub mod error;
pub mod ledger;

pub use entry::{CreditDraw, EntryKind, LedgerEntry};
pub use error::LedgerError;
pub use ledger::{ActiveCredit, KindTotals, LedgerSummary, ShipLedger, TransferPlan};
