//! # Revenue API
//!
//! Day values of a mandate. Every write goes through the store's revenue
//! writer, which refreshes `total_revenue` and `last_entry` on the mandate
//! in the same write, so the mandate returned by the list endpoint always
//! agrees with its day values.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use caboard_core::{Cents, DayValueId, MandateId};
use caboard_store::{DayValue, Mandate, MonthlyRevenue};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_path, Validate};
use crate::gate::mandate_for_caller;
use crate::state::AppState;

/// Request to record the revenue of one date.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordDayValueRequest {
    /// ISO date, `YYYY-MM-DD`.
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub value_cents: i64,
}

impl Validate for RecordDayValueRequest {
    fn validate(&self) -> Result<(), String> {
        if self.value_cents < 0 {
            return Err("value_cents must not be negative".to_string());
        }
        Ok(())
    }
}

/// Request to correct a recorded day value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDayValueRequest {
    pub value_cents: i64,
}

impl Validate for UpdateDayValueRequest {
    fn validate(&self) -> Result<(), String> {
        if self.value_cents < 0 {
            return Err("value_cents must not be negative".to_string());
        }
        Ok(())
    }
}

/// Day values of a mandate with its cached aggregates.
#[derive(Debug, Serialize)]
pub struct DayValueListing {
    pub mandate: Mandate,
    pub day_values: Vec<DayValue>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/mandates/{id}/day-values",
            get(list_day_values).post(record_day_value),
        )
        .route(
            "/v1/mandates/{id}/day-values/{day_value_id}",
            put(update_day_value).delete(delete_day_value),
        )
        .route("/v1/mandates/{id}/revenue/{year}", get(monthly_revenue))
}

fn caller_mandate(state: &AppState, caller: &CallerIdentity, raw: &str) -> Result<MandateId, AppError> {
    let mandate: MandateId = parse_path(raw)?;
    mandate_for_caller(state, caller, mandate)?;
    Ok(mandate)
}

/// The day value, provided it belongs to `mandate`.
fn owned_day_value(state: &AppState, mandate: MandateId, raw: &str) -> Result<DayValueId, AppError> {
    let id: DayValueId = parse_path(raw)?;
    if state.ledger().day_values(mandate)?.iter().any(|d| d.id == id) {
        Ok(id)
    } else {
        Err(AppError::NotFound(format!("day value {id} not found")))
    }
}

/// GET /v1/mandates/{id}/day-values
#[utoipa::path(
    get,
    path = "/v1/mandates/{id}/day-values",
    params(("id" = String, Path, description = "Mandate ID")),
    responses(
        (status = 200, description = "Mandate with its day values in date order"),
        (status = 404, description = "Not found or not the caller's", body = crate::error::ErrorBody),
    ),
    tag = "revenue"
)]
pub async fn list_day_values(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<DayValueListing>, AppError> {
    let mandate: MandateId = parse_path(&id)?;
    let mandate = mandate_for_caller(&state, &caller, mandate)?;
    let day_values = state.ledger().day_values(mandate.id)?;
    Ok(Json(DayValueListing { mandate, day_values }))
}

/// POST /v1/mandates/{id}/day-values
#[utoipa::path(
    post,
    path = "/v1/mandates/{id}/day-values",
    params(("id" = String, Path, description = "Mandate ID")),
    request_body = RecordDayValueRequest,
    responses(
        (status = 201, description = "Day value recorded"),
        (status = 409, description = "Date already recorded", body = crate::error::ErrorBody),
        (status = 422, description = "Value out of range", body = crate::error::ErrorBody),
    ),
    tag = "revenue"
)]
pub async fn record_day_value(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<RecordDayValueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DayValue>), AppError> {
    let mandate = caller_mandate(&state, &caller, &id)?;
    let req = extract_validated_json(body)?;
    let day_value = state
        .store
        .record_day_value(mandate, req.date, Cents(req.value_cents))
        .await?;
    Ok((StatusCode::CREATED, Json(day_value)))
}

/// PUT /v1/mandates/{id}/day-values/{day_value_id}
#[utoipa::path(
    put,
    path = "/v1/mandates/{id}/day-values/{day_value_id}",
    params(
        ("id" = String, Path, description = "Mandate ID"),
        ("day_value_id" = String, Path, description = "Day value ID"),
    ),
    request_body = UpdateDayValueRequest,
    responses(
        (status = 200, description = "Day value corrected"),
        (status = 404, description = "No such day value on this mandate", body = crate::error::ErrorBody),
    ),
    tag = "revenue"
)]
pub async fn update_day_value(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, day_value_id)): Path<(String, String)>,
    body: Result<Json<UpdateDayValueRequest>, JsonRejection>,
) -> Result<Json<DayValue>, AppError> {
    let mandate = caller_mandate(&state, &caller, &id)?;
    let day_value = owned_day_value(&state, mandate, &day_value_id)?;
    let req = extract_validated_json(body)?;
    Ok(Json(
        state
            .store
            .update_day_value(day_value, Cents(req.value_cents))
            .await?,
    ))
}

/// DELETE /v1/mandates/{id}/day-values/{day_value_id}
#[utoipa::path(
    delete,
    path = "/v1/mandates/{id}/day-values/{day_value_id}",
    params(
        ("id" = String, Path, description = "Mandate ID"),
        ("day_value_id" = String, Path, description = "Day value ID"),
    ),
    responses(
        (status = 200, description = "Day value deleted"),
        (status = 404, description = "No such day value on this mandate", body = crate::error::ErrorBody),
    ),
    tag = "revenue"
)]
pub async fn delete_day_value(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, day_value_id)): Path<(String, String)>,
) -> Result<Json<DayValue>, AppError> {
    let mandate = caller_mandate(&state, &caller, &id)?;
    let day_value = owned_day_value(&state, mandate, &day_value_id)?;
    Ok(Json(state.store.delete_day_value(day_value).await?))
}

/// GET /v1/mandates/{id}/revenue/{year}
#[utoipa::path(
    get,
    path = "/v1/mandates/{id}/revenue/{year}",
    params(
        ("id" = String, Path, description = "Mandate ID"),
        ("year" = i32, Path, description = "Calendar year"),
    ),
    responses((status = 200, description = "Revenue per month, January to December")),
    tag = "revenue"
)]
pub async fn monthly_revenue(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, year)): Path<(String, String)>,
) -> Result<Json<Vec<MonthlyRevenue>>, AppError> {
    let mandate = caller_mandate(&state, &caller, &id)?;
    let year: i32 = parse_path(&year)?;
    Ok(Json(state.ledger().monthly_revenue(mandate, year)?))
}
