//! # Payroll API
//!
//! Payroll is a gated feature: every route answers `403
//! FEATURE_NOT_AVAILABLE` unless the caller's plan includes `payroll`.
//!
//! The authority endpoint reconciles the manual monthly entries with the
//! external imports and reports which source the dashboard should trust.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use caboard_core::{Cents, Feature, MandateId, Timestamp, YearMonth};
use caboard_payroll::{
    AuthoritativePayroll, AuthorityRule, Employee, ManualPayrollEntry, MonthlyPayrollSummary,
    PayrollImport,
};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{check_name, extract_query, extract_validated_json, parse_path, Validate};
use crate::gate::{mandate_for_caller, require_feature};
use crate::state::AppState;

/// Query of the authority endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorityQuery {
    /// `recorded_recency` (default) or `latest_period`.
    #[serde(default)]
    pub rule: Option<AuthorityRule>,
}

/// Manual payroll for one month. Replaces any earlier entry for that month.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualPayrollRequest {
    pub year: i32,
    pub month: u32,
    pub employee_count: u32,
    pub gross_payroll_cents: i64,
}

impl Validate for ManualPayrollRequest {
    fn validate(&self) -> Result<(), String> {
        if self.gross_payroll_cents < 0 {
            return Err("gross_payroll_cents must not be negative".to_string());
        }
        Ok(())
    }
}

/// An upload from an external payroll system.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PayrollImportRequest {
    pub total_employees: u32,
    pub gross_payroll_cents: i64,
    /// RFC 3339 upload time. Defaults to now.
    #[serde(default)]
    pub import_date: Option<String>,
    /// Pay period the upload covers, when the source reports one.
    #[serde(default)]
    pub period_year: Option<i32>,
    #[serde(default)]
    pub period_month: Option<u32>,
}

impl Validate for PayrollImportRequest {
    fn validate(&self) -> Result<(), String> {
        if self.gross_payroll_cents < 0 {
            return Err("gross_payroll_cents must not be negative".to_string());
        }
        if self.period_year.is_some() != self.period_month.is_some() {
            return Err("period_year and period_month must be given together".to_string());
        }
        Ok(())
    }
}

/// Request to add an employee to a mandate.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddEmployeeRequest {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Validate for AddEmployeeRequest {
    fn validate(&self) -> Result<(), String> {
        check_name("name", &self.name)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/mandates/{id}/payroll/authority", get(payroll_authority))
        .route(
            "/v1/mandates/{id}/payroll/summary/{year}/{month}",
            get(payroll_summary),
        )
        .route("/v1/mandates/{id}/payroll/manual", put(record_manual))
        .route("/v1/mandates/{id}/payroll/imports", post(record_import))
        .route("/v1/mandates/{id}/employees", post(add_employee))
}

/// Feature gate first, then tenant check.
fn payroll_mandate(state: &AppState, caller: &CallerIdentity, raw: &str) -> Result<MandateId, AppError> {
    require_feature(state, caller, Feature::Payroll)?;
    let mandate: MandateId = parse_path(raw)?;
    mandate_for_caller(state, caller, mandate)?;
    Ok(mandate)
}

/// GET /v1/mandates/{id}/payroll/authority
#[utoipa::path(
    get,
    path = "/v1/mandates/{id}/payroll/authority",
    params(
        ("id" = String, Path, description = "Mandate ID"),
        ("rule" = Option<String>, Query, description = "recorded_recency (default) or latest_period"),
    ),
    responses(
        (status = 200, description = "Authoritative employee count and its source"),
        (status = 403, description = "FEATURE_NOT_AVAILABLE", body = crate::error::ErrorBody),
        (status = 404, description = "Not found or not the caller's", body = crate::error::ErrorBody),
    ),
    tag = "payroll"
)]
pub async fn payroll_authority(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    query: Result<Query<AuthorityQuery>, QueryRejection>,
) -> Result<Json<AuthoritativePayroll>, AppError> {
    let mandate = payroll_mandate(&state, &caller, &id)?;
    let query = extract_query(query)?;
    let rule = query.rule.unwrap_or_default();
    let authority = state
        .payroll()
        .with_rule(rule)
        .resolve_authoritative_payroll(mandate)?;
    Ok(Json(authority))
}

/// GET /v1/mandates/{id}/payroll/summary/{year}/{month}
#[utoipa::path(
    get,
    path = "/v1/mandates/{id}/payroll/summary/{year}/{month}",
    params(
        ("id" = String, Path, description = "Mandate ID"),
        ("year" = i32, Path, description = "Calendar year"),
        ("month" = u32, Path, description = "Month, 1 to 12"),
    ),
    responses(
        (status = 200, description = "Revenue, payroll and their ratio"),
        (status = 403, description = "FEATURE_NOT_AVAILABLE", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid period", body = crate::error::ErrorBody),
    ),
    tag = "payroll"
)]
pub async fn payroll_summary(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, year, month)): Path<(String, String, String)>,
) -> Result<Json<MonthlyPayrollSummary>, AppError> {
    let mandate = payroll_mandate(&state, &caller, &id)?;
    let year: i32 = parse_path(&year)?;
    let month: u32 = parse_path(&month)?;
    Ok(Json(
        state.payroll().monthly_payroll_summary(mandate, year, month)?,
    ))
}

/// PUT /v1/mandates/{id}/payroll/manual
#[utoipa::path(
    put,
    path = "/v1/mandates/{id}/payroll/manual",
    params(("id" = String, Path, description = "Mandate ID")),
    request_body = ManualPayrollRequest,
    responses(
        (status = 200, description = "Manual entry recorded"),
        (status = 403, description = "FEATURE_NOT_AVAILABLE", body = crate::error::ErrorBody),
    ),
    tag = "payroll"
)]
pub async fn record_manual(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<ManualPayrollRequest>, JsonRejection>,
) -> Result<Json<ManualPayrollEntry>, AppError> {
    let mandate = payroll_mandate(&state, &caller, &id)?;
    let req = extract_validated_json(body)?;
    let entry = ManualPayrollEntry {
        mandate_id: mandate,
        period: YearMonth::new(req.year, req.month)?,
        employee_count: req.employee_count,
        gross_payroll: Cents(req.gross_payroll_cents),
    };
    Ok(Json(state.store.record_manual_payroll(entry).await?))
}

/// POST /v1/mandates/{id}/payroll/imports
#[utoipa::path(
    post,
    path = "/v1/mandates/{id}/payroll/imports",
    params(("id" = String, Path, description = "Mandate ID")),
    request_body = PayrollImportRequest,
    responses(
        (status = 201, description = "Import recorded"),
        (status = 403, description = "FEATURE_NOT_AVAILABLE", body = crate::error::ErrorBody),
        (status = 409, description = "An import already exists at that time", body = crate::error::ErrorBody),
    ),
    tag = "payroll"
)]
pub async fn record_import(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<PayrollImportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PayrollImport>), AppError> {
    let mandate = payroll_mandate(&state, &caller, &id)?;
    let req = extract_validated_json(body)?;
    let import_date = match req.import_date.as_deref() {
        Some(raw) => Timestamp::parse(raw)?,
        None => Timestamp::now(),
    };
    let period = match (req.period_year, req.period_month) {
        (Some(year), Some(month)) => Some(YearMonth::new(year, month)?),
        _ => None,
    };
    let import = PayrollImport {
        mandate_id: mandate,
        import_date,
        total_employees: req.total_employees,
        period,
        gross_payroll: Cents(req.gross_payroll_cents),
    };
    let import = state.store.record_payroll_import(import).await?;
    Ok((StatusCode::CREATED, Json(import)))
}

/// POST /v1/mandates/{id}/employees
#[utoipa::path(
    post,
    path = "/v1/mandates/{id}/employees",
    params(("id" = String, Path, description = "Mandate ID")),
    request_body = AddEmployeeRequest,
    responses(
        (status = 201, description = "Employee added"),
        (status = 403, description = "FEATURE_NOT_AVAILABLE", body = crate::error::ErrorBody),
    ),
    tag = "payroll"
)]
pub async fn add_employee(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<AddEmployeeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    let mandate = payroll_mandate(&state, &caller, &id)?;
    let req = extract_validated_json(body)?;
    let employee = state
        .store
        .add_employee(mandate, &req.name, req.active)
        .await?;
    Ok((StatusCode::CREATED, Json(employee)))
}
