//! # Pool Subcommand
//!
//! Runs the allocator over a JSON array of members:
//!
//! ```json
//! [{ "ship_id": "A", "cb_before": "1200.00" }, { "ship_id": "B", "cb_before": "-800.00" }]
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use fuelc_core::RegulatoryParams;
use fuelc_pooling::{allocate, PoolMember, PoolMemberInput};

/// Arguments for the pool subcommand.
#[derive(Args, Debug)]
pub struct PoolArgs {
    /// Path to the members JSON file.
    pub members_file: PathBuf,
}

pub fn run(args: &PoolArgs) -> anyhow::Result<Vec<PoolMember>> {
    let raw = std::fs::read_to_string(&args.members_file)
        .with_context(|| format!("reading {}", args.members_file.display()))?;
    let members: Vec<PoolMemberInput> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.members_file.display()))?;
    tracing::debug!(members = members.len(), "allocating pool");
    Ok(allocate(&members, &RegulatoryParams::default())?)
}
