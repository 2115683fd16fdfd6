//! # Database Persistence Layer
//!
//! Optional PostgreSQL persistence via SQLx. When `DATABASE_URL` is set the
//! API writes compliance records, ledger entries, pools and routes through to the
//! database after each successful engine operation, and hydrates the
//! in-memory store from it on startup. Without it the API runs in-memory
//! only.
//!
//! Tables: `compliance_records`, `ledger_entries` (append-only), `pools`,
//! `pool_members`, `routes`. Schema lives in `migrations/`.

pub mod ledger;
pub mod pools;
pub mod records;
pub mod routes;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run migrations.
///
/// Returns `None` when no URL is configured (in-memory-only mode) and `Err`
/// if the URL is set but connecting or migrating fails.
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!(
            "DATABASE_URL not set; running in-memory only. \
             Ledger state will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Map a stored value that fails domain validation to a decode error.
pub(crate) fn decode_error(column: &str, err: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        )),
    }
}
