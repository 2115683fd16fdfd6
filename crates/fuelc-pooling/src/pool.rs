//! A pool: the persisted result of one successful allocation.

use serde::{Deserialize, Serialize};

use fuelc_core::{CbAmount, ComplianceYear, PoolId, ShipId, Timestamp};

use crate::allocator::PoolMember;

/// An allocated pool. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub year: ComplianceYear,
    /// Members in the order they were submitted.
    pub members: Vec<PoolMember>,
    pub created_at: Timestamp,
}

impl Pool {
    pub fn new(year: ComplianceYear, members: Vec<PoolMember>, created_at: Timestamp) -> Self {
        Self {
            id: PoolId::new(),
            year,
            members,
            created_at,
        }
    }

    pub fn member(&self, ship_id: &ShipId) -> Option<&PoolMember> {
        self.members.iter().find(|m| &m.ship_id == ship_id)
    }

    pub fn contains(&self, ship_id: &ShipId) -> bool {
        self.member(ship_id).is_some()
    }

    /// `Σ cb_before`, which allocation preserves.
    pub fn total(&self) -> CbAmount {
        self.members.iter().map(|m| m.cb_before).sum()
    }
}
