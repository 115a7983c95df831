//! # Prometheus Metrics
//!
//! Counters go through the `metrics` facade; `metrics-exporter-prometheus`
//! renders them at `/metrics`. Without an installed recorder every
//! increment is a no-op, which is what tests run with.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use caboard_core::{Feature, LimitDimension};

pub const HTTP_REQUESTS_TOTAL: &str = "caboard_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "caboard_http_request_duration_seconds";
pub const FEATURE_DENIALS_TOTAL: &str = "caboard_feature_denials_total";
pub const LIMIT_REFUSALS_TOTAL: &str = "caboard_limit_refusals_total";

/// Install the global Prometheus recorder. Call once, at startup.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests by method, route and status");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request duration in seconds");
    describe_counter!(FEATURE_DENIALS_TOTAL, "Gated requests refused for lack of a plan feature");
    describe_counter!(LIMIT_REFUSALS_TOTAL, "Creations refused at a plan limit");

    Ok(handle)
}

/// A gated route refused a feature.
pub fn record_feature_denial(feature: Feature) {
    counter!(FEATURE_DENIALS_TOTAL, "feature" => feature.as_str()).increment(1);
}

/// A creation was refused at a plan limit.
pub fn record_limit_refusal(dimension: LimitDimension) {
    counter!(LIMIT_REFUSALS_TOTAL, "dimension" => dimension.as_str()).increment(1);
}

/// Count and time every request, labelled by matched route template.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Route templates keep label cardinality bounded; raw paths carry ids.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "route" => route.clone(), "status" => status)
        .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "route" => route)
        .record(started.elapsed().as_secs_f64());

    response
}
