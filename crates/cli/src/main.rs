//! FuelEU CLI - Main entry point

use clap::{Parser, Subcommand};
use fueleu_cli::{commands, AppContext};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fueleu")]
#[command(about = "FuelEU Maritime compliance ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and store a ship's compliance balance for a year
    ComputeCb {
        /// Ship id
        ship: i64,
        /// Reporting year
        year: i32,
        /// Fuel consumption in tons
        fuel_tons: Decimal,
        /// Actual GHG intensity in gCO2e/MJ
        intensity: Decimal,
    },

    /// Apply an additive adjustment to a stored compliance balance
    AdjustCb {
        ship: i64,
        year: i32,
        /// Signed delta in gCO2eq
        delta: Decimal,
    },

    /// Show a ship's compliance history
    History { ship: i64 },

    /// Delete all compliance and banking data for a ship
    Purge { ship: i64 },

    /// Bank a surplus for a ship and year
    Bank {
        ship: i64,
        year: i32,
        /// Surplus amount in gCO2eq
        amount: Decimal,
    },

    /// Apply banked surplus against a target year (oldest year first)
    Apply {
        ship: i64,
        /// Year whose compliance balance receives the credit
        target_year: i32,
        /// Amount to apply in gCO2eq
        amount: Decimal,
    },

    /// Show a ship's bank entries and net position
    Surplus { ship: i64 },

    /// Create a pool for a year from member snapshots
    PoolCreate {
        year: i32,
        /// Members as 'ship:cb' pairs, e.g. 101:500 102:-200
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// List pools
    Pools {
        /// Filter by year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Show the members of a pool
    PoolMembers { pool_id: i64 },

    /// Register a route
    RouteAdd {
        route_id: String,
        year: i32,
        /// GHG intensity in gCO2e/MJ
        intensity: Decimal,
    },

    /// Designate the baseline route
    RouteBaseline { route_id: String },

    /// Compare all routes against the baseline
    RouteCompare,

    /// Seed demo data
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let ctx = AppContext::new(&cli.data).await?;

    match cli.command {
        Commands::ComputeCb {
            ship,
            year,
            fuel_tons,
            intensity,
        } => {
            commands::compute_cb(&ctx, ship, year, fuel_tons, intensity).await?;
        }

        Commands::AdjustCb { ship, year, delta } => {
            commands::adjust_cb(&ctx, ship, year, delta).await?;
        }

        Commands::History { ship } => {
            commands::history(&ctx, ship).await?;
        }

        Commands::Purge { ship } => {
            commands::purge(&ctx, ship).await?;
        }

        Commands::Bank { ship, year, amount } => {
            commands::bank(&ctx, ship, year, amount).await?;
        }

        Commands::Apply {
            ship,
            target_year,
            amount,
        } => {
            commands::apply(&ctx, ship, target_year, amount).await?;
        }

        Commands::Surplus { ship } => {
            commands::surplus(&ctx, ship).await?;
        }

        Commands::PoolCreate { year, members } => {
            commands::pool_create(&ctx, year, &members).await?;
        }

        Commands::Pools { year } => {
            commands::pools(&ctx, year).await?;
        }

        Commands::PoolMembers { pool_id } => {
            commands::pool_members(&ctx, pool_id).await?;
        }

        Commands::RouteAdd {
            route_id,
            year,
            intensity,
        } => {
            commands::route_add(&ctx, &route_id, year, intensity).await?;
        }

        Commands::RouteBaseline { route_id } => {
            commands::route_baseline(&ctx, &route_id).await?;
        }

        Commands::RouteCompare => {
            commands::route_compare(&ctx).await?;
        }

        Commands::Seed => {
            commands::seed(&ctx).await?;
        }
    }

    Ok(())
}
