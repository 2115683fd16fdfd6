//! # fuelc-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment
//! (see [`AppConfig::from_env`]).

use fuelc_api::state::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    fuelc_api::serve(config).await
}
