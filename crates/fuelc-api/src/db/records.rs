//! Compliance record persistence (`compliance_records` table).

use sqlx::PgPool;

use fuelc_compliance::ComplianceRecord;
use fuelc_core::{CbAmount, ComplianceYear, ShipId};

use super::decode_error;

/// Insert or replace the record for its `(ship_id, year)` key.
pub async fn upsert(pool: &PgPool, record: &ComplianceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO compliance_records
             (ship_id, year, actual_intensity, target_intensity, energy_in_scope, cb_hundredths, schedule_version, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, now())
         ON CONFLICT (ship_id, year) DO UPDATE SET
             actual_intensity = EXCLUDED.actual_intensity,
             target_intensity = EXCLUDED.target_intensity,
             energy_in_scope = EXCLUDED.energy_in_scope,
             cb_hundredths = EXCLUDED.cb_hundredths,
             schedule_version = EXCLUDED.schedule_version,
             updated_at = now()",
    )
    .bind(record.ship_id.as_str())
    .bind(i32::from(record.year.value()))
    .bind(record.actual_intensity)
    .bind(record.target_intensity)
    .bind(record.energy_in_scope)
    .bind(record.cb.hundredths())
    .bind(&record.schedule_version)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every record, ordered by ship then year.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ComplianceRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RecordRow>(
        "SELECT ship_id, year, actual_intensity, target_intensity, energy_in_scope, cb_hundredths, schedule_version
         FROM compliance_records ORDER BY ship_id, year",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RecordRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RecordRow {
    ship_id: String,
    year: i32,
    actual_intensity: f64,
    target_intensity: f64,
    energy_in_scope: f64,
    cb_hundredths: i64,
    schedule_version: String,
}

impl RecordRow {
    /// Rows that no longer pass domain validation fail the load instead of
    /// being skipped; a silently dropped record would change balances.
    fn into_record(self) -> Result<ComplianceRecord, sqlx::Error> {
        Ok(ComplianceRecord {
            ship_id: ShipId::new(self.ship_id).map_err(|e| decode_error("ship_id", e))?,
            year: ComplianceYear::new(i64::from(self.year)).map_err(|e| decode_error("year", e))?,
            actual_intensity: self.actual_intensity,
            target_intensity: self.target_intensity,
            energy_in_scope: self.energy_in_scope,
            cb: CbAmount::from_hundredths(self.cb_hundredths),
            schedule_version: self.schedule_version,
        })
    }
}
