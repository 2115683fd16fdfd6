//! # Pooling Allocator
//!
//! Greedy redistribution of compliance balance inside a pool:
//!
//! 1. Every member starts with `cb_after = cb_before`.
//! 2. Surplus members are visited largest `cb_before` first.
//! 3. Each surplus member covers deficit members, most negative current
//!    `cb_after` first, moving `min(surplus left, deficit left)` per step,
//!    until it is exhausted or no deficit remains.
//!
//! Ties at either step keep input order, so the result is a pure function
//! of the input sequence. All arithmetic is on [`CbAmount`] hundredths, so
//! conservation is exact.
//!
//! The postconditions are checked on the finished allocation and any
//! violation rejects the whole pool.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use fuelc_core::{CbAmount, RegulatoryParams, ShipId, ValidationError};

use crate::error::PoolError;

/// A ship entering a pool with its compliance balance for the pool year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMemberInput {
    pub ship_id: ShipId,
    pub cb_before: CbAmount,
}

/// A pool member after allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMember {
    pub ship_id: ShipId,
    pub cb_before: CbAmount,
    pub cb_after: CbAmount,
}

impl PoolMember {
    /// Balance received (positive) or given away (negative).
    pub fn delta(&self) -> CbAmount {
        self.cb_after - self.cb_before
    }
}

/// Check pool size, member uniqueness and the non-negative pool sum.
pub fn validate_members(
    members: &[PoolMemberInput],
    params: &RegulatoryParams,
) -> Result<CbAmount, PoolError> {
    let size = members.len();
    if size < params.min_pool_size || size > params.max_pool_size {
        return Err(PoolError::InvalidPoolSize {
            size,
            min: params.min_pool_size,
            max: params.max_pool_size,
        });
    }
    let mut seen = HashSet::with_capacity(size);
    for m in members {
        if !seen.insert(&m.ship_id) {
            return Err(PoolError::DuplicateMember {
                ship_id: m.ship_id.clone(),
            });
        }
    }
    let sum = checked_total(members.iter().map(|m| m.cb_before), "cb_before")?;
    if sum.is_negative() {
        return Err(PoolError::PoolSumNegative { sum });
    }
    Ok(sum)
}

/// Allocate the pool. Members are returned in input order.
pub fn allocate(
    members: &[PoolMemberInput],
    params: &RegulatoryParams,
) -> Result<Vec<PoolMember>, PoolError> {
    let total = validate_members(members, params)?;

    let mut out: Vec<PoolMember> = members
        .iter()
        .map(|m| PoolMember {
            ship_id: m.ship_id.clone(),
            cb_before: m.cb_before,
            cb_after: m.cb_before,
        })
        .collect();

    // Stable sorts: equal keys keep input order.
    let mut surplus: Vec<usize> = (0..out.len()).filter(|&i| out[i].cb_before.is_positive()).collect();
    surplus.sort_by_key(|&i| Reverse(out[i].cb_before));
    let mut deficits: Vec<usize> = (0..out.len()).filter(|&i| out[i].cb_before.is_negative()).collect();

    let mut transfers = 0usize;
    for s in surplus {
        deficits.retain(|&d| out[d].cb_after.is_negative());
        if deficits.is_empty() {
            break;
        }
        deficits.sort_by_key(|&d| out[d].cb_after);
        for &d in &deficits {
            let available = out[s].cb_after;
            if !available.is_positive() {
                break;
            }
            let need = -out[d].cb_after;
            if !need.is_positive() {
                continue;
            }
            let moved = available.min(need);
            out[s].cb_after -= moved;
            out[d].cb_after += moved;
            transfers += 1;
        }
    }

    check_postconditions(&out, total)?;
    tracing::debug!(members = out.len(), transfers, total = %total, "pool allocated");
    Ok(out)
}

fn check_postconditions(members: &[PoolMember], before: CbAmount) -> Result<(), PoolError> {
    for m in members {
        if m.cb_before.is_negative() && m.cb_after < m.cb_before {
            return Err(PoolError::DeficitShipWorse {
                ship_id: m.ship_id.clone(),
                cb_before: m.cb_before,
                cb_after: m.cb_after,
            });
        }
        if m.cb_before.is_positive() && m.cb_after.is_negative() {
            return Err(PoolError::SurplusShipNegative {
                ship_id: m.ship_id.clone(),
                cb_before: m.cb_before,
                cb_after: m.cb_after,
            });
        }
    }
    let after = checked_total(members.iter().map(|m| m.cb_after), "cb_after")?;
    if after != before {
        return Err(PoolError::ConservationViolated { before, after });
    }
    Ok(())
}

fn checked_total(amounts: impl Iterator<Item = CbAmount>, field: &str) -> Result<CbAmount, PoolError> {
    CbAmount::checked_sum(amounts).ok_or_else(|| {
        ValidationError::AmountOutOfRange(format!("sum of member {field} values overflows")).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(grams: i64) -> CbAmount {
        CbAmount::from_grams(grams).unwrap()
    }

    fn input(members: &[(&str, i64)]) -> Vec<PoolMemberInput> {
        members
            .iter()
            .map(|(id, cb)| PoolMemberInput {
                ship_id: ShipId::new(*id).unwrap(),
                cb_before: g(*cb),
            })
            .collect()
    }

    fn after(result: &[PoolMember]) -> Vec<(String, i64)> {
        result
            .iter()
            .map(|m| (m.ship_id.to_string(), m.cb_after.hundredths() / 100))
            .collect()
    }

    #[test]
    fn surplus_covers_deficit() {
        let result = allocate(&input(&[("A", 300), ("B", -200)]), &RegulatoryParams::default()).unwrap();
        assert_eq!(after(&result), vec![("A".into(), 100), ("B".into(), 0)]);
        assert_eq!(result[0].delta(), g(-200));
        assert_eq!(result[1].delta(), g(200));
    }

    #[test]
    fn largest_surplus_goes_first_and_result_keeps_input_order() {
        let members = input(&[("D1", -150), ("S_small", 100), ("S_big", 200), ("D2", -50)]);
        let result = allocate(&members, &RegulatoryParams::default()).unwrap();
        // S_big covers D1 (most negative) fully, then 50 of D2; S_small covers nothing more.
        assert_eq!(
            after(&result),
            vec![
                ("D1".into(), 0),
                ("S_small".into(), 100),
                ("S_big".into(), 0),
                ("D2".into(), 0),
            ]
        );
    }

    #[test]
    fn most_negative_current_deficit_is_served_first() {
        let members = input(&[("S1", 60), ("D1", -100), ("D2", -90), ("S2", 50), ("S3", 300)]);
        let result = allocate(&members, &RegulatoryParams::default()).unwrap();
        // Visit order is S3 (300), S1 (60), S2 (50): S3 covers D1 and D2 outright.
        assert_eq!(
            after(&result),
            vec![
                ("S1".into(), 60),
                ("D1".into(), 0),
                ("D2".into(), 0),
                ("S2".into(), 50),
                ("S3".into(), 110),
            ]
        );

        let members = input(&[("S1", 60), ("D1", -100), ("D2", -90), ("S2", 50), ("S3", 90)]);
        let result = allocate(&members, &RegulatoryParams::default()).unwrap();
        // S3 (90) -> D1 to -10; S1 (60) -> D2 (-90) to -30; S2 (50) -> D2 to 0, D1 to 0.
        assert_eq!(
            after(&result),
            vec![
                ("S1".into(), 0),
                ("D1".into(), 0),
                ("D2".into(), 0),
                ("S2".into(), 10),
                ("S3".into(), 0),
            ]
        );
    }

    #[test]
    fn equal_surpluses_keep_input_order() {
        let result = allocate(&input(&[("B", 100), ("A", 100), ("D", -100)]), &RegulatoryParams::default()).unwrap();
        assert_eq!(
            after(&result),
            vec![("B".into(), 0), ("A".into(), 100), ("D".into(), 0)]
        );
    }

    #[test]
    fn negative_sum_is_rejected() {
        let err = allocate(&input(&[("A", 100), ("B", -101)]), &RegulatoryParams::default()).unwrap_err();
        assert_eq!(err, PoolError::PoolSumNegative { sum: g(-1) });
        assert_eq!(err.code(), "POOL_SUM_NEGATIVE");
    }

    #[test]
    fn zero_sum_pool_is_allowed() {
        let result = allocate(&input(&[("A", 100), ("B", -100)]), &RegulatoryParams::default()).unwrap();
        assert!(result.iter().all(|m| m.cb_after.is_zero()));
    }

    #[test]
    fn size_bounds_are_enforced() {
        let params = RegulatoryParams::default();
        assert!(matches!(
            allocate(&input(&[("A", 100)]), &params),
            Err(PoolError::InvalidPoolSize { size: 1, min: 2, max: 100 })
        ));
        let big: Vec<PoolMemberInput> = (0..101)
            .map(|i| PoolMemberInput {
                ship_id: ShipId::new(format!("S{i}")).unwrap(),
                cb_before: g(1),
            })
            .collect();
        assert!(matches!(allocate(&big, &params), Err(PoolError::InvalidPoolSize { size: 101, .. })));
        assert!(allocate(&big[..100], &params).is_ok());
    }

    #[test]
    fn overflowing_member_sum_is_rejected() {
        let huge = CbAmount::from_hundredths(5_000_000_000_000_000_000);
        let members = vec![
            PoolMemberInput { ship_id: ShipId::new("A").unwrap(), cb_before: huge },
            PoolMemberInput { ship_id: ShipId::new("B").unwrap(), cb_before: huge },
        ];
        let err = allocate(&members, &RegulatoryParams::default()).unwrap_err();
        assert!(matches!(err, PoolError::Invalid(ValidationError::AmountOutOfRange(_))));
        assert_eq!(err.class(), fuelc_core::ErrorClass::Validation);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn duplicate_ship_is_rejected() {
        let err = allocate(&input(&[("A", 100), ("A", -50)]), &RegulatoryParams::default()).unwrap_err();
        assert!(matches!(err, PoolError::DuplicateMember { .. }));
    }

    #[test]
    fn postcondition_checks_catch_bad_allocations() {
        let worse = vec![PoolMember {
            ship_id: ShipId::new("D").unwrap(),
            cb_before: g(-10),
            cb_after: g(-11),
        }];
        assert!(matches!(
            check_postconditions(&worse, g(-10)),
            Err(PoolError::DeficitShipWorse { .. })
        ));
        let negative = vec![PoolMember {
            ship_id: ShipId::new("S").unwrap(),
            cb_before: g(10),
            cb_after: g(-1),
        }];
        assert!(matches!(
            check_postconditions(&negative, g(10)),
            Err(PoolError::SurplusShipNegative { .. })
        ));
        let leaky = vec![PoolMember {
            ship_id: ShipId::new("S").unwrap(),
            cb_before: g(10),
            cb_after: g(5),
        }];
        assert!(matches!(
            check_postconditions(&leaky, g(10)),
            Err(PoolError::ConservationViolated { .. })
        ));
    }
}
