//! # Plans Subcommand
//!
//! - `list`: print the catalog the store currently holds.
//! - `seed`: write the configured catalog into the store. Plans are
//!   matched by name, so re-running it only applies changed limits.

use anyhow::Result;
use clap::{Args, Subcommand};

use caboard_entitlements::PlanCatalog;
use caboard_store::Store;

use crate::print_json;

#[derive(Args, Debug)]
pub struct PlansArgs {
    #[command(subcommand)]
    pub command: PlansCommand,
}

#[derive(Subcommand, Debug)]
pub enum PlansCommand {
    /// Print every plan in the store's catalog.
    List,
    /// Seed the configured catalog into the store.
    Seed,
}

pub async fn run_plans(args: &PlansArgs, store: &Store, catalog: PlanCatalog) -> Result<u8> {
    match args.command {
        PlansCommand::List => cmd_list(store),
        PlansCommand::Seed => cmd_seed(store, catalog).await,
    }
}

fn cmd_list(store: &Store) -> Result<u8> {
    print_json(&store.ledger().catalog().plans())?;
    Ok(0)
}

async fn cmd_seed(store: &Store, catalog: PlanCatalog) -> Result<u8> {
    let seeded = store.seed_plans(catalog.plans().to_vec()).await?;
    tracing::info!(plans = seeded.len(), "catalog seeded");
    print_json(&seeded)?;
    Ok(0)
}
