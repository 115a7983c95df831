//! # caboard-api: Axum HTTP Adapter
//!
//! Exposes the entitlement resolver, the limit-gated tenant writes, the
//! revenue ledger and payroll authority over HTTP. Handlers parse and
//! gate; the domain crates decide.
//!
//! ## API Surface
//!
//! | Prefix                                  | Module                      |
//! |-----------------------------------------|-----------------------------|
//! | `/v1/users/{user_id}/features/*`        | [`routes::features`]        |
//! | `/v1/organizations/*`                   | [`routes::organizations`]   |
//! | `/v1/mandates/{id}/day-values`, `/revenue/*` | [`routes::revenue`]    |
//! | `/v1/mandates/{id}/payroll/*`, `/employees`  | [`routes::payroll`]    |
//! | `/openapi.json`                         | [`openapi`]                 |
//! | `/health/*`, `/metrics`                 | unauthenticated             |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod gate;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the auth middleware
/// so they remain reachable without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::features::router())
        .merge(routes::organizations::router())
        .merge(routes::revenue::router())
        .merge(routes::payroll::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config));

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics));

    Router::new().merge(ops).merge(api).with_state(state)
}

/// Liveness probe. Always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. With a database configured, it must answer a ping.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let Some(pool) = state.store.pool() else {
        return (StatusCode::OK, "ready");
    };
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}

/// Prometheus text exposition. Empty when no recorder is installed.
async fn render_metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
