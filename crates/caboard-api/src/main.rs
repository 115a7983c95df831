//! # caboard-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment;
//! see [`AppConfig::from_env`].

use caboard_api::middleware::metrics::install_recorder;
use caboard_api::{AppConfig, AppState};
use caboard_store::Store;

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
    tracing::info!(?config, "starting caboard-api");

    let catalog = config.load_catalog().map_err(|e| {
        tracing::error!("Plan catalog could not be loaded: {e}");
        e
    })?;

    // Absent DATABASE_URL means in-memory only.
    let pool = caboard_store::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;
    let store = match pool {
        Some(pool) => Store::open(pool, catalog).await.map_err(|e| {
            tracing::error!("Database hydration failed: {e}");
            e
        })?,
        None => Store::in_memory(catalog),
    };

    let mut state = AppState::new(store, config.clone());
    match install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!("Prometheus recorder not installed: {e}. /metrics will be empty."),
    }

    let app = caboard_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("caboard API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
