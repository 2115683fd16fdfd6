//! # fuelc-cli: Compliance Engine Command-Line Interface
//!
//! Offline computations against the same calculator and allocator the API
//! uses, plus a `serve` subcommand that starts the HTTP server.
//!
//! ## Subcommands
//!
//! - `cb`: compliance balance for one ship-year
//! - `pool`: allocate a pool from a JSON file of members
//! - `serve`: run the HTTP API
//!
//! Argument parsing lives here next to each handler; the handlers return
//! values and `main` prints them.

pub mod cb;
pub mod pool;
pub mod serve;
