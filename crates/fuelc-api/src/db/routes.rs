//! Route catalogue persistence (`routes` table).
//!
//! Insertion order is the `seq` column. A partial unique index allows one
//! baseline row at most.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use fuelc_compliance::Route;
use fuelc_core::{ComplianceYear, RouteId, Timestamp};

use super::decode_error;

/// Insert a new catalogue route.
pub async fn insert(pool: &PgPool, route: &Route) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO routes
             (route_id, vessel_type, fuel_type, year, ghg_intensity, fuel_consumption, distance,
              total_emissions, is_baseline, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(route.route_id.as_str())
    .bind(route.vessel_type.as_str())
    .bind(route.fuel_type.as_str())
    .bind(i32::from(route.year.value()))
    .bind(route.ghg_intensity)
    .bind(route.fuel_consumption)
    .bind(route.distance)
    .bind(route.total_emissions)
    .bind(route.is_baseline)
    .bind(*route.created_at.as_datetime())
    .bind(*route.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

/// Make `route` the only baseline row, in one transaction.
pub async fn set_baseline(pool: &PgPool, route: &Route) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE routes SET is_baseline = FALSE, updated_at = $1 WHERE is_baseline AND route_id <> $2")
        .bind(*route.updated_at.as_datetime())
        .bind(route.route_id.as_str())
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE routes SET is_baseline = TRUE, updated_at = $1 WHERE route_id = $2")
        .bind(*route.updated_at.as_datetime())
        .bind(route.route_id.as_str())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Load every route in insertion order.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Route>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RouteRow>(
        "SELECT route_id, vessel_type, fuel_type, year, ghg_intensity, fuel_consumption, distance,
                total_emissions, is_baseline, created_at, updated_at
         FROM routes ORDER BY seq",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RouteRow::into_route).collect()
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    route_id: String,
    vessel_type: String,
    fuel_type: String,
    year: i32,
    ghg_intensity: f64,
    fuel_consumption: f64,
    distance: f64,
    total_emissions: f64,
    is_baseline: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RouteRow {
    fn into_route(self) -> Result<Route, sqlx::Error> {
        Ok(Route {
            route_id: RouteId::new(self.route_id).map_err(|e| decode_error("route_id", e))?,
            vessel_type: self.vessel_type.parse().map_err(|e| decode_error("vessel_type", e))?,
            fuel_type: self.fuel_type.parse().map_err(|e| decode_error("fuel_type", e))?,
            year: ComplianceYear::new(i64::from(self.year)).map_err(|e| decode_error("year", e))?,
            ghg_intensity: self.ghg_intensity,
            fuel_consumption: self.fuel_consumption,
            distance: self.distance,
            total_emissions: self.total_emissions,
            is_baseline: self.is_baseline,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}
