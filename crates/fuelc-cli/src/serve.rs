//! # Serve Subcommand
//!
//! Starts the HTTP API. Flags override the matching environment variables.

use clap::Args;

use fuelc_api::state::AppConfig;
use fuelc_core::ComplianceYear;

use crate::cb::ScheduleChoice;

/// Arguments for the serve subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen port (overrides `PORT`).
    #[arg(long)]
    pub port: Option<u16>,

    /// PostgreSQL URL (overrides `DATABASE_URL`).
    #[arg(long)]
    pub database_url: Option<String>,

    /// Pin the current compliance year (overrides `FUELC_COMPLIANCE_YEAR`).
    #[arg(long)]
    pub year: Option<i64>,

    /// Target schedule (overrides `FUELC_TARGET_SCHEDULE`).
    #[arg(long, value_enum)]
    pub schedule: Option<ScheduleChoice>,
}

impl ServeArgs {
    /// Environment configuration with the flags layered on top.
    pub fn config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::from_env().map_err(anyhow::Error::msg)?;
        self.apply(&mut config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut AppConfig) -> anyhow::Result<()> {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(year) = self.year {
            config.compliance_year = Some(ComplianceYear::new(year)?);
        }
        if let Some(schedule) = self.schedule {
            config.schedule = schedule.schedule();
        }
        Ok(())
    }
}

pub fn run(args: &ServeArgs) -> anyhow::Result<()> {
    let config = args.config()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime
        .block_on(fuelc_api::serve(config))
        .map_err(|e| anyhow::anyhow!("server failed: {e}"))
}
