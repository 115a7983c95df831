//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor: the write-through [`Store`], the runtime
//! configuration, and the Prometheus handle when a recorder is installed.

use std::path::PathBuf;

use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;

use caboard_entitlements::{EntitlementError, EntitlementResolver, PlanCatalog};
use caboard_payroll::PayrollReconciler;
use caboard_store::{Ledger, Store};

use crate::error::AppError;

/// Runtime configuration, read from the environment.
#[derive(Clone, Default)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Postgres URL. `None` runs in-memory only.
    pub database_url: Option<String>,
    /// Billing page reported with feature denials.
    pub upgrade_url: Option<String>,
    /// YAML plan catalog. `None` uses the built-in plans.
    pub plan_catalog: Option<PathBuf>,
    /// Emit JSON log lines.
    pub log_json: bool,
}

/// Invalid configuration at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),

    #[error("reading plan catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] EntitlementError),
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, `DATABASE_URL`, `CABOARD_UPGRADE_URL`,
    /// `CABOARD_PLAN_CATALOG` and `CABOARD_LOG_JSON`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8080,
        };
        Ok(Self {
            port,
            auth_token: get("AUTH_TOKEN"),
            database_url: get("DATABASE_URL"),
            upgrade_url: get("CABOARD_UPGRADE_URL"),
            plan_catalog: get("CABOARD_PLAN_CATALOG").map(PathBuf::from),
            log_json: get("CABOARD_LOG_JSON")
                .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        })
    }

    /// The configured plan catalog, or the built-in plans.
    pub fn load_catalog(&self) -> Result<PlanCatalog, ConfigError> {
        let Some(path) = &self.plan_catalog else {
            return Ok(PlanCatalog::defaults());
        };
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogRead {
            path: path.clone(),
            source,
        })?;
        let catalog = PlanCatalog::from_yaml(&source)?;
        tracing::info!(path = %path.display(), plans = catalog.len(), "loaded plan catalog");
        Ok(catalog)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("upgrade_url", &self.upgrade_url)
            .field("plan_catalog", &self.plan_catalog)
            .field("log_json", &self.log_json)
            .finish()
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: AppConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        Self {
            store,
            config,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle rendered at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn ledger(&self) -> &Ledger {
        self.store.ledger()
    }

    /// Run an entitlement query against the current catalog.
    pub fn entitlements<R>(
        &self,
        query: impl FnOnce(&EntitlementResolver<'_, Ledger>) -> Result<R, EntitlementError>,
    ) -> Result<R, AppError> {
        let catalog = self.ledger().catalog();
        let mut resolver = EntitlementResolver::new(self.ledger(), &catalog);
        if let Some(url) = &self.config.upgrade_url {
            resolver = resolver.with_upgrade_url(url.clone());
        }
        Ok(query(&resolver)?)
    }

    pub fn payroll(&self) -> PayrollReconciler<'_, Ledger> {
        PayrollReconciler::new(self.ledger())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
