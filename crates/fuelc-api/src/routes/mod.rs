//! # API Route Modules
//!
//! - `compliance`: compliance records, adjusted positions, intensity comparison.
//! - `banking`: bank surplus, apply banked credits, transfers, balances.
//! - `pooling`: pool creation and lookup.
//! - `catalogue`: route catalogue, baseline and route comparison.
//!
//! Engine operations may wait on per-ship ledger locks, so handlers run them
//! on the blocking pool through [`run_engine`].

pub mod banking;
pub mod catalogue;
pub mod compliance;
pub mod pooling;

use std::sync::Arc;

use fuelc_engine::{AccountingEngine, EngineError};

use crate::error::AppError;
use crate::state::AppState;

/// Run an engine operation off the async executor.
pub(crate) async fn run_engine<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&AccountingEngine) -> Result<T, EngineError> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || op(&engine))
        .await
        .map_err(|e| AppError::Internal(format!("engine task failed: {e}")))?
        .map_err(AppError::from)
}
