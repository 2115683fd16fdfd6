//! Pool persistence (`pools` and `pool_members` tables).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fuelc_core::{CbAmount, ComplianceYear, PoolId, ShipId, Timestamp};
use fuelc_pooling::{Pool, PoolMember};

use super::decode_error;

/// Insert a pool and its members in one transaction.
pub async fn insert(pool: &PgPool, record: &Pool) -> Result<(), sqlx::Error> {
    let year = i32::from(record.year.value());
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO pools (id, year, created_at) VALUES ($1, $2, $3)")
        .bind(record.id.0)
        .bind(year)
        .bind(*record.created_at.as_datetime())
        .execute(&mut *tx)
        .await?;

    for (position, member) in record.members.iter().enumerate() {
        sqlx::query(
            "INSERT INTO pool_members (pool_id, position, ship_id, year, cb_before_hundredths, cb_after_hundredths)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id.0)
        .bind(position as i32)
        .bind(member.ship_id.as_str())
        .bind(year)
        .bind(member.cb_before.hundredths())
        .bind(member.cb_after.hundredths())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load every pool in creation order, members in allocation order.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Pool>, sqlx::Error> {
    let pool_rows = sqlx::query_as::<_, PoolRow>(
        "SELECT id, year, created_at FROM pools ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let member_rows = sqlx::query_as::<_, MemberRow>(
        "SELECT pool_id, ship_id, cb_before_hundredths, cb_after_hundredths
         FROM pool_members ORDER BY pool_id, position",
    )
    .fetch_all(pool)
    .await?;

    let mut members: HashMap<Uuid, Vec<PoolMember>> = HashMap::new();
    for row in member_rows {
        let member = PoolMember {
            ship_id: ShipId::new(row.ship_id).map_err(|e| decode_error("ship_id", e))?,
            cb_before: CbAmount::from_hundredths(row.cb_before_hundredths),
            cb_after: CbAmount::from_hundredths(row.cb_after_hundredths),
        };
        members.entry(row.pool_id).or_default().push(member);
    }

    pool_rows
        .into_iter()
        .map(|row| {
            Ok(Pool {
                id: PoolId(row.id),
                year: ComplianceYear::new(i64::from(row.year))
                    .map_err(|e| decode_error("year", e))?,
                members: members.remove(&row.id).unwrap_or_default(),
                created_at: Timestamp::from_utc(row.created_at),
            })
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct PoolRow {
    id: Uuid,
    year: i32,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    pool_id: Uuid,
    ship_id: String,
    cb_before_hundredths: i64,
    cb_after_hundredths: i64,
}
