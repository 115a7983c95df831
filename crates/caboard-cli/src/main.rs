//! # caboard CLI entry point
//!
//! Parses command-line arguments, opens the configured store and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use caboard_cli::backend::BackendArgs;
use caboard_cli::entitlements::{run_features, run_org, FeaturesArgs, OrgArgs};
use caboard_cli::maintenance::{run_aggregates, run_subscriptions, AggregatesArgs, SubscriptionsArgs};
use caboard_cli::payroll::{run_payroll, PayrollArgs};
use caboard_cli::plans::{run_plans, PlansArgs};

/// caboard operator CLI.
///
/// Plan catalog seeding, entitlement and limit queries, payroll authority,
/// revenue aggregate repair and subscription maintenance.
#[derive(Parser, Debug)]
#[command(name = "caboard", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List or seed the plan catalog.
    Plans(PlansArgs),

    /// Effective plan, limit checks and usage of an organization.
    Org(OrgArgs),

    /// Feature checks for a user.
    Features(FeaturesArgs),

    /// Authoritative payroll and monthly summaries.
    Payroll(PayrollArgs),

    /// Verify or repair cached mandate revenue.
    Aggregates(AggregatesArgs),

    /// Plan changes, cancellation and lapse expiry.
    Subscriptions(SubscriptionsArgs),
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let store = cli.backend.open().await?;
    match &cli.command {
        Commands::Plans(args) => run_plans(args, &store, cli.backend.catalog()?).await,
        Commands::Org(args) => run_org(args, &store),
        Commands::Features(args) => run_features(args, &store),
        Commands::Payroll(args) => run_payroll(args, &store),
        Commands::Aggregates(args) => run_aggregates(args, &store).await,
        Commands::Subscriptions(args) => run_subscriptions(args, &store).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so stdout stays parseable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
