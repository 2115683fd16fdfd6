//! # fuelc-core: Foundational Types for the Compliance Engine
//!
//! This crate is the leaf of the workspace DAG. It defines the primitives
//! every other crate builds on, so that the calculator, the banking ledger
//! and the pooling allocator agree on units and identities by construction.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ShipId`, `RouteId`, `PoolId`, `EntryId` are
//!    distinct types. A pool identifier cannot be passed where a ship is expected.
//!
//! 2. **Fixed-point compliance balances.** [`CbAmount`] stores hundredths of a
//!    gram of CO₂-equivalent in an `i64`. Banking and pooling arithmetic is
//!    integer arithmetic, so conservation holds exactly. Floats appear only at
//!    the calculator boundary and are rounded once (half away from zero).
//!
//! 3. **Validated compliance years.** [`ComplianceYear`] can only hold a year
//!    inside the regulation's active window.
//!
//! 4. **One error taxonomy.** [`ErrorClass`] is the classification every crate
//!    maps its errors into, so callers can decide on retry without matching
//!    on crate-specific variants.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fuelc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod error;
pub mod identity;
pub mod params;
pub mod temporal;
pub mod year;

pub use amount::CbAmount;
pub use error::{ErrorClass, ValidationError};
pub use identity::{EntryId, PoolId, RouteId, ShipId};
pub use params::RegulatoryParams;
pub use temporal::Timestamp;
pub use year::ComplianceYear;
