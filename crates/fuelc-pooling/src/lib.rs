//! # fuelc-pooling: Pooling Allocator
//!
//! Redistributes compliance balance across the ships of a pool for one
//! year so that the pool's aggregate obligation is met and no member is
//! pushed past its legal limits:
//!
//! - a ship that entered with a deficit never exits worse off;
//! - a ship that entered with a surplus never exits negative;
//! - `Σ cb_after == Σ cb_before`, exactly.
//!
//! The allocator is a pure function over at most `MAX_POOL_SIZE` members.
//! Snapshotting each member's `cb_before` and persisting the [`Pool`] are
//! the caller's concern.

pub mod allocator;
pub mod error;
pub mod pool;

pub use allocator::{allocate, validate_members, PoolMember, PoolMemberInput};
pub use error::PoolError;
pub use pool::Pool;
