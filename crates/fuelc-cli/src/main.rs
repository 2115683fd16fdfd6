//! # fuelc CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// fuelc: FuelEU compliance balance, banking and pooling engine.
#[derive(Parser, Debug)]
#[command(name = "fuelc", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compute the compliance balance of one ship-year.
    Cb(fuelc_cli::cb::CbArgs),
    /// Allocate a pool from a JSON file of members.
    Pool(fuelc_cli::pool::PoolArgs),
    /// Run the HTTP API.
    Serve(fuelc_cli::serve::ServeArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Cb(args) => {
            let record = fuelc_cli::cb::run(&args)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Pool(args) => {
            let members = fuelc_cli::pool::run(&args)?;
            println!("{}", serde_json::to_string_pretty(&members)?);
        }
        Commands::Serve(args) => fuelc_cli::serve::run(&args)?,
    }

    Ok(())
}
