//! # Route Catalogue Types
//!
//! A [`Route`] is one reported voyage profile: vessel and fuel type, the
//! compliance year it belongs to, its GHG intensity and the operational
//! totals behind it. At most one route in a catalogue is the baseline;
//! [`compare_routes`] rates every other route against it.
//!
//! Storage and the single-baseline rule live in `fuelc-engine`. This module
//! only validates and compares.

use serde::{Deserialize, Serialize};

use fuelc_core::{ComplianceYear, RouteId, Timestamp, ValidationError};

use crate::comparison::compare_intensity;
use crate::schedule::TargetSchedule;

/// Vessel category of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VesselType {
    Container,
    BulkCarrier,
    Tanker,
    RoRo,
}

impl VesselType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "Container",
            Self::BulkCarrier => "BulkCarrier",
            Self::Tanker => "Tanker",
            Self::RoRo => "RoRo",
        }
    }
}

impl std::fmt::Display for VesselType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VesselType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Container" => Ok(Self::Container),
            "BulkCarrier" => Ok(Self::BulkCarrier),
            "Tanker" => Ok(Self::Tanker),
            "RoRo" => Ok(Self::RoRo),
            other => Err(format!("unknown vessel type {other:?}")),
        }
    }
}

/// Main fuel burned on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FuelType {
    /// Heavy fuel oil.
    Hfo,
    /// Liquefied natural gas.
    Lng,
    /// Marine gas oil.
    Mgo,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hfo => "HFO",
            Self::Lng => "LNG",
            Self::Mgo => "MGO",
        }
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HFO" => Ok(Self::Hfo),
            "LNG" => Ok(Self::Lng),
            "MGO" => Ok(Self::Mgo),
            other => Err(format!("unknown fuel type {other:?}")),
        }
    }
}

/// Input for adding a route to the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoute {
    pub route_id: RouteId,
    pub vessel_type: VesselType,
    pub fuel_type: FuelType,
    pub year: i64,
    /// gCO₂e/MJ.
    pub ghg_intensity: f64,
    /// Tonnes.
    pub fuel_consumption: f64,
    /// Kilometres.
    pub distance: f64,
    /// Tonnes CO₂e.
    pub total_emissions: f64,
}

/// A stored catalogue route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: RouteId,
    pub vessel_type: VesselType,
    pub fuel_type: FuelType,
    pub year: ComplianceYear,
    pub ghg_intensity: f64,
    pub fuel_consumption: f64,
    pub distance: f64,
    pub total_emissions: f64,
    pub is_baseline: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Route {
    /// Validate `new` and build a non-baseline route created at `at`.
    pub fn create(new: NewRoute, at: Timestamp) -> Result<Self, ValidationError> {
        let year = ComplianceYear::new(new.year)?;
        for (field, value) in [
            ("ghg_intensity", new.ghg_intensity),
            ("fuel_consumption", new.fuel_consumption),
            ("distance", new.distance),
            ("total_emissions", new.total_emissions),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteInput { field });
            }
            if value < 0.0 {
                return Err(ValidationError::NegativeInput { field, value });
            }
        }
        Ok(Self {
            route_id: new.route_id,
            vessel_type: new.vessel_type,
            fuel_type: new.fuel_type,
            year,
            ghg_intensity: new.ghg_intensity,
            fuel_consumption: new.fuel_consumption,
            distance: new.distance,
            total_emissions: new.total_emissions,
            is_baseline: false,
            created_at: at,
            updated_at: at,
        })
    }
}

/// Catalogue query. Unset fields match every route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFilter {
    pub vessel_type: Option<VesselType>,
    pub fuel_type: Option<FuelType>,
    pub year: Option<ComplianceYear>,
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        self.vessel_type.map_or(true, |v| route.vessel_type == v)
            && self.fuel_type.map_or(true, |f| route.fuel_type == f)
            && self.year.map_or(true, |y| route.year == y)
    }
}

/// One route rated against the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteComparison {
    pub baseline: Route,
    pub comparison: Route,
    /// `(comparison / baseline − 1) × 100` of the GHG intensities.
    pub percent_diff: f64,
    pub target_intensity: f64,
    /// Comparison intensity at or below the target of `target_year`.
    pub compliant: bool,
}

/// Rate every route except the baseline against it and against the target
/// of `target_year`. Input order is kept.
pub fn compare_routes(
    schedule: &TargetSchedule,
    baseline: &Route,
    routes: &[Route],
    target_year: ComplianceYear,
) -> Result<Vec<RouteComparison>, ValidationError> {
    routes
        .iter()
        .filter(|r| r.route_id != baseline.route_id)
        .map(|r| {
            let c = compare_intensity(schedule, target_year, baseline.ghg_intensity, r.ghg_intensity)?;
            Ok(RouteComparison {
                baseline: baseline.clone(),
                comparison: r.clone(),
                percent_diff: c.percent_diff,
                target_intensity: c.target_intensity,
                compliant: c.compliant,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, vessel: VesselType, fuel: FuelType, year: i64, intensity: f64) -> Route {
        Route::create(
            NewRoute {
                route_id: RouteId::new(id).unwrap(),
                vessel_type: vessel,
                fuel_type: fuel,
                year,
                ghg_intensity: intensity,
                fuel_consumption: 5_000.0,
                distance: 12_000.0,
                total_emissions: 4_500.0,
            },
            Timestamp::parse("2025-03-01T00:00:00Z").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn create_validates_year_and_quantities() {
        let mut new = NewRoute {
            route_id: RouteId::new("R001").unwrap(),
            vessel_type: VesselType::Container,
            fuel_type: FuelType::Hfo,
            year: 2024,
            ghg_intensity: 91.0,
            fuel_consumption: 5_000.0,
            distance: 12_000.0,
            total_emissions: 4_500.0,
        };
        let at = Timestamp::now();
        assert!(matches!(
            Route::create(new.clone(), at),
            Err(ValidationError::UnsupportedYear { year: 2024, .. })
        ));
        new.year = 2025;
        new.distance = -1.0;
        assert!(matches!(
            Route::create(new.clone(), at),
            Err(ValidationError::NegativeInput { field: "distance", .. })
        ));
        new.distance = 12_000.0;
        let r = Route::create(new, at).unwrap();
        assert!(!r.is_baseline);
        assert_eq!(r.created_at, r.updated_at);
    }

    #[test]
    fn filter_combines_fields() {
        let a = route("R001", VesselType::Container, FuelType::Hfo, 2025, 91.0);
        let b = route("R002", VesselType::BulkCarrier, FuelType::Lng, 2025, 88.0);
        let by_fuel = RouteFilter { fuel_type: Some(FuelType::Lng), ..RouteFilter::default() };
        assert!(!by_fuel.matches(&a));
        assert!(by_fuel.matches(&b));
        let both = RouteFilter {
            vessel_type: Some(VesselType::Container),
            year: Some(ComplianceYear::new(2030).unwrap()),
            ..RouteFilter::default()
        };
        assert!(!both.matches(&a));
        assert!(RouteFilter::default().matches(&a));
    }

    #[test]
    fn comparison_skips_baseline_and_rates_the_rest() {
        let base = route("R001", VesselType::Container, FuelType::Hfo, 2025, 91.0);
        let routes = vec![
            base.clone(),
            route("R002", VesselType::BulkCarrier, FuelType::Lng, 2025, 88.0),
            route("R003", VesselType::Tanker, FuelType::Mgo, 2025, 93.5),
        ];
        let year = ComplianceYear::new(2025).unwrap();
        let out = compare_routes(&TargetSchedule::default(), &base, &routes, year).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].comparison.route_id.as_str(), "R002");
        assert!(out[0].compliant);
        assert!((out[0].percent_diff - (88.0 / 91.0 - 1.0) * 100.0).abs() < 1e-12);
        assert!(!out[1].compliant);
        assert_eq!(out[1].target_intensity, 89.3368);
    }

    #[test]
    fn wire_names_match_catalogue_labels() {
        assert_eq!(serde_json::to_string(&FuelType::Lng).unwrap(), "\"LNG\"");
        assert_eq!(serde_json::to_string(&VesselType::BulkCarrier).unwrap(), "\"BulkCarrier\"");
        assert_eq!("RoRo".parse::<VesselType>().unwrap(), VesselType::RoRo);
        assert!("Ferry".parse::<VesselType>().is_err());
        assert_eq!("MGO".parse::<FuelType>().unwrap(), FuelType::Mgo);
    }
}
