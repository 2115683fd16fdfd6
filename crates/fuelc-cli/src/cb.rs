//! # Cb Subcommand
//!
//! Computes a compliance balance without touching any store.

use clap::{Args, ValueEnum};

use fuelc_compliance::{ComplianceCalculator, ComplianceRecord, RawShipYearMetrics, TargetSchedule};
use fuelc_core::{RegulatoryParams, ShipId};

/// Target schedule to compute against.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScheduleChoice {
    /// Anchors 2025, 2030 and 2035 only; other years are unsupported.
    #[default]
    AnchorsV0,
    /// Regulation reduction periods, every year 2025..=2050.
    Fueleu2023,
}

impl ScheduleChoice {
    pub(crate) fn schedule(self) -> TargetSchedule {
        match self {
            Self::Fueleu2023 => TargetSchedule::fueleu_2023(),
            Self::AnchorsV0 => TargetSchedule::anchors_v0(),
        }
    }
}

/// Arguments for the cb subcommand.
#[derive(Args, Debug)]
pub struct CbArgs {
    /// Ship identifier.
    #[arg(long)]
    pub ship: String,

    /// Compliance year.
    #[arg(long)]
    pub year: i64,

    /// Achieved GHG intensity in gCO₂e/MJ.
    #[arg(long)]
    pub intensity: f64,

    /// Fuel consumed in tonnes.
    #[arg(long)]
    pub fuel: f64,

    #[arg(long, value_enum, default_value_t = ScheduleChoice::AnchorsV0)]
    pub schedule: ScheduleChoice,
}

pub fn run(args: &CbArgs) -> anyhow::Result<ComplianceRecord> {
    let calculator = ComplianceCalculator::new(args.schedule.schedule(), &RegulatoryParams::default());
    let record = calculator.compute(&RawShipYearMetrics {
        ship_id: ShipId::new(args.ship.as_str())?,
        year: args.year,
        actual_intensity: args.intensity,
        fuel_consumption: args.fuel,
    })?;
    Ok(record)
}
