//! # Ledger Entries
//!
//! The append-only unit of the banking ledger. An entry's effect on the
//! ship's balance is its signed `amount`; what the entry *means* is carried
//! by [`EntryKind`], never by the sign.
//!
//! | Kind         | `year`                         | `amount` | `draws`                    |
//! |--------------|--------------------------------|----------|----------------------------|
//! | `Deposit`    | source year of the credit       | `> 0`    | empty                      |
//! | `Withdrawal` | deficit year the credit covers  | `< 0`    | source years consumed      |
//! | `Transfer`   | oldest source year consumed     | `< 0`    | source years consumed      |
//! | `Expired`    | source year swept               | `< 0`    | the single swept year      |
//!
//! A deposit received through a transfer carries `transfer_ref` pointing at
//! the sender's `Transfer` entry and keeps the original source year, so the
//! credit's expiry clock is unchanged by the move.

use serde::{Deserialize, Serialize};

use fuelc_core::{CbAmount, ComplianceYear, EntryId, ShipId, Timestamp};

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Surplus banked into the ledger, or credits received from another ship.
    Deposit,
    /// Banked credits applied to cover a deficit year.
    Withdrawal,
    /// Banked credits moved to another ship's ledger.
    Transfer,
    /// System-generated sweep of a credit past its usable window.
    Expired,
}

impl EntryKind {
    /// Whether entries of this kind consume active credits.
    pub fn consumes_credits(&self) -> bool {
        !matches!(self, Self::Deposit)
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Transfer => "TRANSFER",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            "TRANSFER" => Ok(Self::Transfer),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(format!("unknown ledger entry kind {other:?}")),
        }
    }
}

/// Quantity taken from the credits of one source year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDraw {
    pub source_year: ComplianceYear,
    /// Always positive.
    pub amount: CbAmount,
}

/// One immutable line of a ship's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub ship_id: ShipId,
    pub year: ComplianceYear,
    /// Signed effect on the ship's balance.
    pub amount: CbAmount,
    pub kind: EntryKind,
    /// Receiving ship. Set on `Transfer` entries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_ship_id: Option<ShipId>,
    /// Sender's `Transfer` entry, for deposits received through a transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_ref: Option<EntryId>,
    /// Credits consumed, oldest source year first. Empty for deposits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub draws: Vec<CreditDraw>,
    pub created_at: Timestamp,
}

impl LedgerEntry {
    /// A deposit of own surplus banked from `year`.
    pub fn deposit(ship_id: ShipId, year: ComplianceYear, amount: CbAmount, at: Timestamp) -> Self {
        Self {
            id: EntryId::new(),
            ship_id,
            year,
            amount,
            kind: EntryKind::Deposit,
            counterparty_ship_id: None,
            transfer_ref: None,
            draws: Vec::new(),
            created_at: at,
        }
    }

    /// A consuming entry (`Withdrawal`, `Transfer`, `Expired`) for `draws`.
    ///
    /// The amount is the negated sum of the draws.
    pub fn consuming(
        ship_id: ShipId,
        kind: EntryKind,
        year: ComplianceYear,
        draws: Vec<CreditDraw>,
        at: Timestamp,
    ) -> Self {
        let total: CbAmount = draws.iter().map(|d| d.amount).sum();
        Self {
            id: EntryId::new(),
            ship_id,
            year,
            amount: -total,
            kind,
            counterparty_ship_id: None,
            transfer_ref: None,
            draws,
            created_at: at,
        }
    }

    /// Whether this deposit came from another ship rather than own surplus.
    pub fn is_received_transfer(&self) -> bool {
        self.kind == EntryKind::Deposit && self.transfer_ref.is_some()
    }

    /// Absolute quantity moved by this entry.
    pub fn magnitude(&self) -> CbAmount {
        self.amount.abs()
    }
}
