//! Ledger entry persistence (`ledger_entries` table, append-only).
//!
//! The full entry is stored as JSON in `payload`; the scalar columns exist
//! for querying. Append order is the `seq` column.

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use fuelc_banking::LedgerEntry;
use fuelc_core::ShipId;

use super::decode_error;

/// Persist the entries of `ships`' logs not yet in the table, keeping
/// their order, in one transaction. Either every ship's new entries land or
/// none do. Returns the number inserted.
pub async fn insert_missing(
    pool: &PgPool,
    ships: &[ShipId],
    entries: &[LedgerEntry],
) -> Result<u64, sqlx::Error> {
    if entries.is_empty() {
        return Ok(0);
    }
    let ship_ids: Vec<String> = ships.iter().map(|s| s.as_str().to_string()).collect();

    let mut tx = pool.begin().await?;
    let known: HashSet<Uuid> =
        sqlx::query_as::<_, (Uuid,)>("SELECT id FROM ledger_entries WHERE ship_id = ANY($1)")
            .bind(&ship_ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id,)| id)
            .collect();

    let fresh = fresh_entries(entries, &known);
    if fresh.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    for entry in fresh {
        let payload = serde_json::to_value(entry).map_err(|e| {
            tracing::error!(entry_id = %entry.id, error = %e, "failed to serialize ledger entry");
            sqlx::Error::Encode(Box::new(e))
        })?;
        let result = sqlx::query(
            "INSERT INTO ledger_entries (id, ship_id, year, kind, amount_hundredths, transfer_ref, payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(entry.id.0)
        .bind(entry.ship_id.as_str())
        .bind(i32::from(entry.year.value()))
        .bind(entry.kind.as_str())
        .bind(entry.amount.hundredths())
        .bind(entry.transfer_ref.map(|r| r.0))
        .bind(&payload)
        .bind(*entry.created_at.as_datetime())
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

/// Entries whose id is not in `known`, in input order. An id seen twice in
/// `entries` is kept once.
fn fresh_entries<'a>(entries: &'a [LedgerEntry], known: &HashSet<Uuid>) -> Vec<&'a LedgerEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .iter()
        .filter(|e| !known.contains(&e.id.0) && seen.insert(e.id.0))
        .collect()
}

/// Load every entry in append order.
pub async fn load_all(pool: &PgPool) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let rows: Vec<(serde_json::Value,)> =
        sqlx::query_as("SELECT payload FROM ledger_entries ORDER BY seq")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(payload,)| serde_json::from_value(payload).map_err(|e| decode_error("payload", e)))
        .collect()
}
