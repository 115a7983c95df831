//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI 3.1
//! document served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "caboard API",
        version = "0.1.0",
        description = "Plan entitlements, organization limits, revenue day values and payroll authority for caboard tenants.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Features
        crate::routes::features::check_feature,
        crate::routes::features::feature_report,
        // Organizations
        crate::routes::organizations::create_organization,
        crate::routes::organizations::get_organization,
        crate::routes::organizations::get_plan,
        crate::routes::organizations::get_limit,
        crate::routes::organizations::get_usage,
        crate::routes::organizations::list_members,
        crate::routes::organizations::add_member,
        crate::routes::organizations::remove_member,
        crate::routes::organizations::list_mandates,
        crate::routes::organizations::create_mandate,
        crate::routes::organizations::list_files,
        crate::routes::organizations::add_file,
        crate::routes::organizations::remove_file,
        // Revenue
        crate::routes::revenue::list_day_values,
        crate::routes::revenue::record_day_value,
        crate::routes::revenue::update_day_value,
        crate::routes::revenue::delete_day_value,
        crate::routes::revenue::monthly_revenue,
        // Payroll
        crate::routes::payroll::payroll_authority,
        crate::routes::payroll::payroll_summary,
        crate::routes::payroll::record_manual,
        crate::routes::payroll::record_import,
        crate::routes::payroll::add_employee,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::features::FeatureCheckResponse,
        crate::routes::organizations::CreateOrganizationRequest,
        crate::routes::organizations::AddMemberRequest,
        crate::routes::organizations::CreateMandateRequest,
        crate::routes::organizations::AddFileRequest,
        crate::routes::revenue::RecordDayValueRequest,
        crate::routes::revenue::UpdateDayValueRequest,
        crate::routes::payroll::ManualPayrollRequest,
        crate::routes::payroll::PayrollImportRequest,
        crate::routes::payroll::AddEmployeeRequest,
    )),
    tags(
        (name = "features", description = "Feature access by plan tier"),
        (name = "organizations", description = "Effective plan, limits and limit-gated creation"),
        (name = "revenue", description = "Day values and cached mandate aggregates"),
        (name = "payroll", description = "Payroll authority and monthly summaries"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
