//! # Feature Access API
//!
//! Read-only feature checks for a user. Unknown feature names answer
//! `allowed: false` rather than an error, so callers can probe features
//! this deployment does not know.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use caboard_core::UserId;
use caboard_entitlements::FeatureAccessReport;

use crate::error::AppError;
use crate::extractors::parse_path;
use crate::state::AppState;

/// Answer to a single feature check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeatureCheckResponse {
    pub feature: String,
    pub allowed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users/{user_id}/features", get(feature_report))
        .route("/v1/users/{user_id}/features/{feature}", get(check_feature))
}

/// GET /v1/users/{user_id}/features/{feature}
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/features/{feature}",
    params(
        ("user_id" = String, Path, description = "User ID"),
        ("feature" = String, Path, description = "Feature name, e.g. payroll"),
    ),
    responses(
        (status = 200, description = "Feature check", body = FeatureCheckResponse),
        (status = 422, description = "Malformed user id", body = crate::error::ErrorBody),
    ),
    tag = "features"
)]
pub async fn check_feature(
    State(state): State<AppState>,
    Path((user_id, feature)): Path<(String, String)>,
) -> Result<Json<FeatureCheckResponse>, AppError> {
    let user: UserId = parse_path(&user_id)?;
    let allowed = state.entitlements(|r| r.has_feature_access_named(user, &feature))?;
    Ok(Json(FeatureCheckResponse { feature, allowed }))
}

/// GET /v1/users/{user_id}/features
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/features",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Allow/deny for every feature and the effective tier"),
        (status = 422, description = "Malformed user id", body = crate::error::ErrorBody),
    ),
    tag = "features"
)]
pub async fn feature_report(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<FeatureAccessReport>, AppError> {
    let user: UserId = parse_path(&user_id)?;
    Ok(Json(state.entitlements(|r| r.feature_access_report(user))?))
}
