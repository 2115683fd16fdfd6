//! # Ship Ledger: Incremental Balance and FIFO Credit Queue
//!
//! A [`ShipLedger`] is the in-memory projection of one ship's entries. It
//! keeps, updated on every [`apply`](ShipLedger::apply):
//!
//! - the running balance (`Σ amount` over all entries),
//! - the active-credit queue, ordered by source year and then by deposit
//!   order, each credit carrying its unconsumed remainder,
//! - per-year totals of own deposits and applied withdrawals.
//!
//! The projection can always be rebuilt from the entries alone
//! ([`replay`](ShipLedger::replay)); [`verify_replay`](ShipLedger::verify_replay)
//! checks that the incremental state equals the replayed one.
//!
//! ## Two-phase operations
//!
//! The `prepare_*` methods validate a request against the current state and
//! return the entries to append, without mutating anything. The caller
//! persists them and only then calls `apply`. A failed store write therefore
//! leaves the projection untouched.
//!
//! ## Expiry
//!
//! A credit from source year `Y` is usable through `Y + max_apply_years`.
//! Expiry is evaluated against an explicit `as_of` compliance year: expired
//! credits are excluded from every balance query and draw plan, and
//! [`expired_sweep`](ShipLedger::expired_sweep) produces the `Expired`
//! entries that remove them from the queue for good.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fuelc_core::{CbAmount, ComplianceYear, EntryId, RegulatoryParams, ShipId, Timestamp, ValidationError};

use crate::entry::{CreditDraw, EntryKind, LedgerEntry};
use crate::error::LedgerError;

// ── Derived views ──────────────────────────────────────────────────────

/// A banked deposit that still has an unconsumed remainder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCredit {
    /// The `Deposit` entry that created this credit.
    pub entry_id: EntryId,
    pub source_year: ComplianceYear,
    pub remaining: CbAmount,
    /// Last compliance year in which the credit may be drawn.
    pub usable_through: u16,
}

/// Lifetime totals per entry kind, as positive magnitudes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotals {
    /// Own surplus banked.
    pub deposited: CbAmount,
    /// Credits received from other ships.
    pub received: CbAmount,
    pub withdrawn: CbAmount,
    pub transferred_out: CbAmount,
    pub expired: CbAmount,
}

/// Banking statistics for one ship as of a compliance year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub ship_id: ShipId,
    pub as_of: ComplianceYear,
    pub available_balance: CbAmount,
    pub active_credits: Vec<ActiveCredit>,
    /// Remainder of credits in their last usable year.
    pub expiring_soon: CbAmount,
    /// Share of everything banked or received that was since withdrawn or
    /// transferred out, in percent. Zero for a ledger that never held credits.
    pub utilization_rate: f64,
    pub totals: KindTotals,
    pub entry_count: usize,
}

/// The entries a transfer appends: one on the sender, one deposit per
/// source year on the receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPlan {
    pub outgoing: LedgerEntry,
    pub incoming: Vec<LedgerEntry>,
}

// ── ShipLedger ─────────────────────────────────────────────────────────

/// Projection of one ship's ledger entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipLedger {
    ship_id: ShipId,
    max_bank_fraction_bps: u32,
    max_apply_years: u16,
    entries: Vec<LedgerEntry>,
    credits: Vec<ActiveCredit>,
    balance: CbAmount,
    banked_by_year: BTreeMap<ComplianceYear, CbAmount>,
    applied_by_year: BTreeMap<ComplianceYear, CbAmount>,
    totals: KindTotals,
}

impl ShipLedger {
    /// An empty ledger.
    pub fn new(ship_id: ShipId, params: &RegulatoryParams) -> Self {
        Self {
            ship_id,
            max_bank_fraction_bps: params.max_bank_fraction_bps,
            max_apply_years: params.max_apply_years,
            entries: Vec::new(),
            credits: Vec::new(),
            balance: CbAmount::ZERO,
            banked_by_year: BTreeMap::new(),
            applied_by_year: BTreeMap::new(),
            totals: KindTotals::default(),
        }
    }

    /// Rebuild the projection from entries in append order.
    pub fn replay(
        ship_id: ShipId,
        params: &RegulatoryParams,
        entries: impl IntoIterator<Item = LedgerEntry>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(ship_id, params);
        for entry in entries {
            ledger.apply(entry)?;
        }
        Ok(ledger)
    }

    pub fn ship_id(&self) -> &ShipId {
        &self.ship_id
    }

    /// All entries, in append order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Running `Σ amount` over every entry applied so far.
    ///
    /// Equals the remainder of all queued credits, expired or not. Use
    /// [`available_balance`](Self::available_balance) for what may be drawn.
    pub fn balance(&self) -> CbAmount {
        self.balance
    }

    pub fn totals(&self) -> &KindTotals {
        &self.totals
    }

    /// Own surplus banked from `year` so far.
    pub fn banked_from(&self, year: ComplianceYear) -> CbAmount {
        self.banked_by_year.get(&year).copied().unwrap_or_default()
    }

    /// Credits applied to the deficit of `year` so far.
    pub fn applied_to(&self, year: ComplianceYear) -> CbAmount {
        self.applied_by_year.get(&year).copied().unwrap_or_default()
    }

    /// Last compliance year in which credits from `source_year` may be drawn.
    pub fn usable_through(&self, source_year: ComplianceYear) -> u16 {
        source_year.value().saturating_add(self.max_apply_years)
    }

    fn is_expired(&self, source_year: ComplianceYear, as_of: ComplianceYear) -> bool {
        as_of.value() > self.usable_through(source_year)
    }

    /// Sum of non-expired credit remainders as of `as_of`.
    pub fn available_balance(&self, as_of: ComplianceYear) -> CbAmount {
        self.credits
            .iter()
            .filter(|c| !self.is_expired(c.source_year, as_of))
            .map(|c| c.remaining)
            .sum()
    }

    /// Non-expired credits as of `as_of`, oldest first.
    pub fn active_credits(&self, as_of: ComplianceYear) -> Vec<ActiveCredit> {
        self.credits
            .iter()
            .filter(|c| !self.is_expired(c.source_year, as_of))
            .cloned()
            .collect()
    }

    /// Non-expired credits that lapse within `within_years` compliance
    /// years, `as_of` included. `within_years = 1` selects credits whose last
    /// usable year is `as_of`.
    pub fn expiring_credits(&self, as_of: ComplianceYear, within_years: u16) -> Vec<ActiveCredit> {
        let horizon = u32::from(as_of.value()) + u32::from(within_years);
        self.credits
            .iter()
            .filter(|c| !self.is_expired(c.source_year, as_of))
            .filter(|c| u32::from(c.usable_through) < horizon)
            .cloned()
            .collect()
    }

    /// `(withdrawn + transferred out) / (deposited + received)` in percent.
    pub fn utilization_rate(&self) -> f64 {
        let t = &self.totals;
        let inflow = t.deposited.to_f64() + t.received.to_f64();
        if inflow <= 0.0 {
            return 0.0;
        }
        (t.withdrawn.to_f64() + t.transferred_out.to_f64()) / inflow * 100.0
    }

    pub fn summary(&self, as_of: ComplianceYear) -> LedgerSummary {
        LedgerSummary {
            ship_id: self.ship_id.clone(),
            as_of,
            available_balance: self.available_balance(as_of),
            active_credits: self.active_credits(as_of),
            expiring_soon: self.expiring_credits(as_of, 1).iter().map(|c| c.remaining).sum(),
            utilization_rate: self.utilization_rate(),
            totals: self.totals.clone(),
            entry_count: self.entries.len(),
        }
    }

    // ── Planning ───────────────────────────────────────────────────────

    /// FIFO draw plan for `amount`: oldest non-expired credits first, one
    /// draw per source year.
    pub fn plan_draws(
        &self,
        amount: CbAmount,
        as_of: ComplianceYear,
    ) -> Result<Vec<CreditDraw>, LedgerError> {
        let available = self.available_balance(as_of);
        if amount > available {
            return Err(LedgerError::InsufficientBankedAmount {
                ship_id: self.ship_id.clone(),
                requested: amount,
                available,
            });
        }

        let mut left = amount;
        let mut draws: Vec<CreditDraw> = Vec::new();
        for credit in self.credits.iter().filter(|c| !self.is_expired(c.source_year, as_of)) {
            if left.is_zero() {
                break;
            }
            let take = credit.remaining.min(left);
            left -= take;
            match draws.last_mut() {
                Some(last) if last.source_year == credit.source_year => last.amount += take,
                _ => draws.push(CreditDraw {
                    source_year: credit.source_year,
                    amount: take,
                }),
            }
        }
        Ok(draws)
    }

    /// `Expired` entries sweeping every credit past its window at `as_of`,
    /// one entry per source year.
    pub fn expired_sweep(&self, as_of: ComplianceYear, at: Timestamp) -> Vec<LedgerEntry> {
        let mut by_year: BTreeMap<ComplianceYear, CbAmount> = BTreeMap::new();
        for credit in self.credits.iter().filter(|c| self.is_expired(c.source_year, as_of)) {
            *by_year.entry(credit.source_year).or_default() += credit.remaining;
        }
        by_year
            .into_iter()
            .map(|(source_year, amount)| {
                LedgerEntry::consuming(
                    self.ship_id.clone(),
                    EntryKind::Expired,
                    source_year,
                    vec![CreditDraw { source_year, amount }],
                    at,
                )
            })
            .collect()
    }

    /// Validate banking `amount` of the surplus of `year`.
    ///
    /// `cb` is the balance available for banking: the raw compliance balance
    /// plus any pool allocation delta for the year. The cap is cumulative
    /// over all own deposits from `year`.
    pub fn prepare_deposit(
        &self,
        year: ComplianceYear,
        amount: CbAmount,
        cb: CbAmount,
        as_of: ComplianceYear,
        at: Timestamp,
    ) -> Result<LedgerEntry, LedgerError> {
        require_positive(amount)?;
        if year > as_of {
            return Err(LedgerError::FutureDeposit { year, current: as_of });
        }
        if self.is_expired(year, as_of) {
            return Err(LedgerError::SourceYearExpired {
                year,
                usable_through: self.usable_through(year),
            });
        }
        if !cb.is_positive() {
            return Err(LedgerError::NothingToBank {
                ship_id: self.ship_id.clone(),
                year,
                cb,
            });
        }
        let cap = (cb.fraction_bps(self.max_bank_fraction_bps) - self.banked_from(year))
            .max(CbAmount::ZERO);
        if amount > cap {
            return Err(LedgerError::ExceedsBankCap {
                ship_id: self.ship_id.clone(),
                year,
                requested: amount,
                cap,
            });
        }
        Ok(LedgerEntry::deposit(self.ship_id.clone(), year, amount, at))
    }

    /// Validate applying `amount` of banked credits to the deficit of `year`.
    ///
    /// `cb` is the raw compliance balance plus any pool delta for the year.
    pub fn prepare_withdrawal(
        &self,
        year: ComplianceYear,
        amount: CbAmount,
        cb: CbAmount,
        as_of: ComplianceYear,
        at: Timestamp,
    ) -> Result<LedgerEntry, LedgerError> {
        require_positive(amount)?;
        if !cb.is_negative() {
            return Err(LedgerError::NoDeficitToCover {
                ship_id: self.ship_id.clone(),
                year,
                cb,
            });
        }
        let draws = self.plan_draws(amount, as_of)?;
        let outstanding = (cb.abs() - self.applied_to(year)).max(CbAmount::ZERO);
        if amount > outstanding {
            return Err(LedgerError::ExceedsDeficit {
                ship_id: self.ship_id.clone(),
                year,
                requested: amount,
                outstanding,
            });
        }
        Ok(LedgerEntry::consuming(
            self.ship_id.clone(),
            EntryKind::Withdrawal,
            year,
            draws,
            at,
        ))
    }

    /// Validate moving `amount` of banked credits to `to`.
    ///
    /// Each received deposit keeps the source year it was drawn from.
    pub fn prepare_transfer(
        &self,
        to: &ShipId,
        amount: CbAmount,
        as_of: ComplianceYear,
        at: Timestamp,
    ) -> Result<TransferPlan, LedgerError> {
        require_positive(amount)?;
        if *to == self.ship_id {
            return Err(LedgerError::SameShipTransfer {
                ship_id: self.ship_id.clone(),
            });
        }
        let draws = self.plan_draws(amount, as_of)?;
        let oldest = draws
            .first()
            .map(|d| d.source_year)
            .ok_or_else(|| self.corrupt("positive draw plan has no draws"))?;

        let mut outgoing =
            LedgerEntry::consuming(self.ship_id.clone(), EntryKind::Transfer, oldest, draws, at);
        outgoing.counterparty_ship_id = Some(to.clone());

        let incoming = outgoing
            .draws
            .iter()
            .map(|draw| {
                let mut entry = LedgerEntry::deposit(to.clone(), draw.source_year, draw.amount, at);
                entry.transfer_ref = Some(outgoing.id);
                entry
            })
            .collect();

        Ok(TransferPlan { outgoing, incoming })
    }

    // ── Mutation ───────────────────────────────────────────────────────

    /// Apply one persisted entry to the projection.
    ///
    /// The entry is checked in full before any state changes, so a rejected
    /// entry leaves the ledger as it was.
    pub fn apply(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if entry.ship_id != self.ship_id {
            return Err(self.corrupt(format!(
                "entry {} belongs to ship {}",
                entry.id, entry.ship_id
            )));
        }

        match entry.kind {
            EntryKind::Deposit => {
                if !entry.amount.is_positive() || !entry.draws.is_empty() {
                    return Err(self.corrupt(format!("deposit {} is malformed", entry.id)));
                }
                let credit = ActiveCredit {
                    entry_id: entry.id,
                    source_year: entry.year,
                    remaining: entry.amount,
                    usable_through: self.usable_through(entry.year),
                };
                let position = self
                    .credits
                    .partition_point(|c| c.source_year <= entry.year);
                self.credits.insert(position, credit);
                if entry.transfer_ref.is_some() {
                    self.totals.received += entry.amount;
                } else {
                    self.totals.deposited += entry.amount;
                    *self.banked_by_year.entry(entry.year).or_default() += entry.amount;
                }
            }
            kind => {
                self.check_draws(&entry)?;
                for draw in &entry.draws {
                    self.consume(draw.source_year, draw.amount);
                }
                let magnitude = entry.magnitude();
                match kind {
                    EntryKind::Withdrawal => {
                        self.totals.withdrawn += magnitude;
                        *self.applied_by_year.entry(entry.year).or_default() += magnitude;
                    }
                    EntryKind::Transfer => self.totals.transferred_out += magnitude,
                    _ => self.totals.expired += magnitude,
                }
            }
        }

        self.balance += entry.amount;
        self.entries.push(entry);
        Ok(())
    }

    fn check_draws(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let drawn: CbAmount = entry.draws.iter().map(|d| d.amount).sum();
        if entry.draws.is_empty() || drawn != -entry.amount {
            return Err(self.corrupt(format!(
                "{} entry {} amount {} does not match its draws {}",
                entry.kind, entry.id, entry.amount, drawn
            )));
        }
        let mut needed: BTreeMap<ComplianceYear, CbAmount> = BTreeMap::new();
        for draw in &entry.draws {
            if !draw.amount.is_positive() {
                return Err(self.corrupt(format!("entry {} has a non-positive draw", entry.id)));
            }
            *needed.entry(draw.source_year).or_default() += draw.amount;
        }
        for (year, amount) in needed {
            let held: CbAmount = self
                .credits
                .iter()
                .filter(|c| c.source_year == year)
                .map(|c| c.remaining)
                .sum();
            if amount > held {
                return Err(self.corrupt(format!(
                    "entry {} draws {amount} from {year} but only {held} is held",
                    entry.id
                )));
            }
        }
        Ok(())
    }

    fn consume(&mut self, source_year: ComplianceYear, amount: CbAmount) {
        let mut left = amount;
        for credit in self.credits.iter_mut().filter(|c| c.source_year == source_year) {
            if left.is_zero() {
                break;
            }
            let take = credit.remaining.min(left);
            credit.remaining -= take;
            left -= take;
        }
        self.credits.retain(|c| c.remaining.is_positive());
    }

    // ── Audit ──────────────────────────────────────────────────────────

    /// Check the incremental projection against a full replay of its entries.
    pub fn verify_replay(&self) -> Result<(), LedgerError> {
        let params = RegulatoryParams {
            max_bank_fraction_bps: self.max_bank_fraction_bps,
            max_apply_years: self.max_apply_years,
            ..RegulatoryParams::default()
        };
        let replayed = Self::replay(self.ship_id.clone(), &params, self.entries.iter().cloned())?;
        if replayed != *self {
            return Err(self.corrupt("incremental state differs from replayed state"));
        }
        let queued: CbAmount = self.credits.iter().map(|c| c.remaining).sum();
        if queued != self.balance {
            return Err(self.corrupt(format!(
                "balance {} differs from queued credits {queued}",
                self.balance
            )));
        }
        Ok(())
    }

    fn corrupt(&self, detail: impl Into<String>) -> LedgerError {
        LedgerError::CorruptHistory {
            ship_id: self.ship_id.clone(),
            detail: detail.into(),
        }
    }
}

fn require_positive(amount: CbAmount) -> Result<(), ValidationError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveAmount { amount })
    }
}
