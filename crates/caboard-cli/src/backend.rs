//! # Store Selection
//!
//! The CLI works on the same data as the API: a Postgres database when
//! `--database-url` is given, otherwise a JSON snapshot file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use caboard_entitlements::{EntitlementResolver, PlanCatalog};
use caboard_store::{Ledger, Store};

/// Where the CLI reads and writes tenant data.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// JSON snapshot file, used when no database is given.
    #[arg(long, env = "CABOARD_SNAPSHOT", global = true)]
    pub snapshot: Option<PathBuf>,

    /// YAML plan catalog. Defaults to the built-in plans.
    #[arg(long, env = "CABOARD_PLAN_CATALOG", global = true)]
    pub plan_catalog: Option<PathBuf>,
}

impl BackendArgs {
    /// The configured catalog file, or the built-in plans.
    pub fn catalog(&self) -> Result<PlanCatalog> {
        let Some(path) = &self.plan_catalog else {
            return Ok(PlanCatalog::defaults());
        };
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading plan catalog {}", path.display()))?;
        PlanCatalog::from_yaml(&source)
            .with_context(|| format!("parsing plan catalog {}", path.display()))
    }

    pub async fn open(&self) -> Result<Store> {
        let catalog = self.catalog()?;
        if let Some(url) = &self.database_url {
            let pool = caboard_store::db::init_pool(Some(url))
                .await?
                .context("database pool not created")?;
            return Ok(Store::open(pool, catalog).await?);
        }
        if let Some(path) = &self.snapshot {
            return Store::open_snapshot(path, catalog)
                .with_context(|| format!("opening snapshot {}", path.display()));
        }
        bail!("no store configured: pass --database-url or --snapshot")
    }
}

/// Run an entitlement query against the store's current catalog.
pub fn with_resolver<R>(
    store: &Store,
    query: impl FnOnce(&EntitlementResolver<'_, Ledger>) -> Result<R, caboard_entitlements::EntitlementError>,
) -> Result<R> {
    let catalog = store.ledger().catalog();
    let resolver = EntitlementResolver::new(store.ledger(), &catalog);
    Ok(query(&resolver)?)
}
