//! # Organization API
//!
//! Effective plan, limit status and usage for an organization, plus the
//! limit-gated creations: members (`users`), mandates (`mandates`) and
//! stored files (`storage`, in bytes). Every creation runs
//! `can_perform_action` in the store's write section and answers
//! `403 LIMIT_EXCEEDED` when the plan has no room.
//!
//! The caller must belong to the organization addressed.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use caboard_core::{FileId, LimitDimension, OrganizationId, UserId};
use caboard_entitlements::{EffectivePlan, LimitStatus};
use caboard_store::{Mandate, MemberRole, Organization, OrganizationUser, StoredFile};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{check_name, extract_validated_json, parse_path, Validate};
use crate::gate::{require_member, within_limits};
use crate::state::AppState;

/// Request to create an organization owned by the caller.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

impl Validate for CreateOrganizationRequest {
    fn validate(&self) -> Result<(), String> {
        check_name("name", &self.name)
    }
}

/// Request to add a user to an organization.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: String,
    /// OWNER, ADMIN or MEMBER. Defaults to MEMBER.
    #[serde(default)]
    pub role: Option<String>,
}

impl Validate for AddMemberRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("user_id must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to create a mandate.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMandateRequest {
    pub name: String,
}

impl Validate for CreateMandateRequest {
    fn validate(&self) -> Result<(), String> {
        check_name("name", &self.name)
    }
}

/// Request to record an uploaded file.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddFileRequest {
    pub name: String,
    pub size_bytes: u64,
}

impl Validate for AddFileRequest {
    fn validate(&self) -> Result<(), String> {
        check_name("name", &self.name)
    }
}

/// Organization created for the caller.
#[derive(Debug, Serialize)]
pub struct CreatedOrganization {
    pub organization: Organization,
    pub owner: OrganizationUser,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/organizations", post(create_organization))
        .route("/v1/organizations/{id}", get(get_organization))
        .route("/v1/organizations/{id}/plan", get(get_plan))
        .route("/v1/organizations/{id}/limits/{dimension}", get(get_limit))
        .route("/v1/organizations/{id}/usage", get(get_usage))
        .route(
            "/v1/organizations/{id}/members",
            get(list_members).post(add_member),
        )
        .route(
            "/v1/organizations/{id}/members/{user_id}",
            delete(remove_member),
        )
        .route(
            "/v1/organizations/{id}/mandates",
            get(list_mandates).post(create_mandate),
        )
        .route(
            "/v1/organizations/{id}/files",
            get(list_files).post(add_file),
        )
        .route("/v1/organizations/{id}/files/{file_id}", delete(remove_file))
}

fn member_org(state: &AppState, caller: &CallerIdentity, raw: &str) -> Result<OrganizationId, AppError> {
    let org: OrganizationId = parse_path(raw)?;
    require_member(state, caller, org)?;
    Ok(org)
}

/// POST /v1/organizations
#[utoipa::path(
    post,
    path = "/v1/organizations",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created with the caller as OWNER"),
        (status = 409, description = "Caller already belongs to an organization", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn create_organization(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateOrganizationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedOrganization>), AppError> {
    let req = extract_validated_json(body)?;
    let owner = state
        .store
        .create_organization_with_owner(&req.name, caller.user_id)
        .await?;
    let organization = state.ledger().organization(owner.organization_id)?;
    tracing::info!(organization = %organization.id, owner = %caller.user_id, "organization created");
    Ok((StatusCode::CREATED, Json(CreatedOrganization { organization, owner })))
}

/// GET /v1/organizations/{id}
#[utoipa::path(
    get,
    path = "/v1/organizations/{id}",
    params(("id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization"),
        (status = 404, description = "Not found or not the caller's", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn get_organization(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    Ok(Json(state.ledger().organization(org)?))
}

/// GET /v1/organizations/{id}/plan
#[utoipa::path(
    get,
    path = "/v1/organizations/{id}/plan",
    params(("id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Effective plan, FREE when no active subscription"),
        (status = 404, description = "Not found or not the caller's", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn get_plan(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<EffectivePlan>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    Ok(Json(state.entitlements(|r| r.resolve_effective_plan(org))?))
}

/// GET /v1/organizations/{id}/limits/{dimension}
#[utoipa::path(
    get,
    path = "/v1/organizations/{id}/limits/{dimension}",
    params(
        ("id" = String, Path, description = "Organization ID"),
        ("dimension" = String, Path, description = "users, mandates, storage, objects, sectors, articles or tasks"),
    ),
    responses(
        (status = 200, description = "Usage against the plan limit"),
        (status = 422, description = "Unknown dimension", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn get_limit(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, dimension)): Path<(String, String)>,
) -> Result<Json<LimitStatus>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    let dimension: LimitDimension = parse_path(&dimension)?;
    Ok(Json(state.entitlements(|r| r.check_organization_limits(org, dimension))?))
}

/// GET /v1/organizations/{id}/usage
#[utoipa::path(
    get,
    path = "/v1/organizations/{id}/usage",
    params(("id" = String, Path, description = "Organization ID")),
    responses((status = 200, description = "Status of every limit dimension")),
    tag = "organizations"
)]
pub async fn get_usage(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Vec<LimitStatus>>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    Ok(Json(state.entitlements(|r| r.organization_usage(org))?))
}

/// GET /v1/organizations/{id}/members
#[utoipa::path(
    get,
    path = "/v1/organizations/{id}/members",
    params(("id" = String, Path, description = "Organization ID")),
    responses((status = 200, description = "Membership rows")),
    tag = "organizations"
)]
pub async fn list_members(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrganizationUser>>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    Ok(Json(state.ledger().members(org)))
}

/// POST /v1/organizations/{id}/members
#[utoipa::path(
    post,
    path = "/v1/organizations/{id}/members",
    params(("id" = String, Path, description = "Organization ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added"),
        (status = 403, description = "LIMIT_EXCEEDED on users", body = crate::error::ErrorBody),
        (status = 409, description = "User already belongs to an organization", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn add_member(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<AddMemberRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrganizationUser>), AppError> {
    let org = member_org(&state, &caller, &id)?;
    let req = extract_validated_json(body)?;
    let user: UserId = parse_path(req.user_id.trim())?;
    let role = match req.role.as_deref() {
        Some(raw) => parse_path::<MemberRole>(raw)?,
        None => MemberRole::Member,
    };
    let member = within_limits(state.store.add_member_within_limits(org, user, role).await)?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// DELETE /v1/organizations/{id}/members/{user_id}
#[utoipa::path(
    delete,
    path = "/v1/organizations/{id}/members/{user_id}",
    params(
        ("id" = String, Path, description = "Organization ID"),
        ("user_id" = String, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 404, description = "Not a member of this organization", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn remove_member(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<OrganizationUser>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    let user: UserId = parse_path(&user_id)?;
    if !state.ledger().members(org).iter().any(|m| m.user_id == user) {
        return Err(AppError::NotFound(format!("member {user} not found")));
    }
    Ok(Json(state.store.remove_member(user).await?))
}

/// GET /v1/organizations/{id}/mandates
#[utoipa::path(
    get,
    path = "/v1/organizations/{id}/mandates",
    params(("id" = String, Path, description = "Organization ID")),
    responses((status = 200, description = "Mandates with cached revenue aggregates")),
    tag = "organizations"
)]
pub async fn list_mandates(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Vec<Mandate>>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    Ok(Json(state.ledger().mandates(org)))
}

/// POST /v1/organizations/{id}/mandates
#[utoipa::path(
    post,
    path = "/v1/organizations/{id}/mandates",
    params(("id" = String, Path, description = "Organization ID")),
    request_body = CreateMandateRequest,
    responses(
        (status = 201, description = "Mandate created"),
        (status = 403, description = "LIMIT_EXCEEDED on mandates", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn create_mandate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<CreateMandateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Mandate>), AppError> {
    let org = member_org(&state, &caller, &id)?;
    let req = extract_validated_json(body)?;
    let mandate = within_limits(state.store.create_mandate_within_limits(org, &req.name).await)?;
    Ok((StatusCode::CREATED, Json(mandate)))
}

/// GET /v1/organizations/{id}/files
#[utoipa::path(
    get,
    path = "/v1/organizations/{id}/files",
    params(("id" = String, Path, description = "Organization ID")),
    responses((status = 200, description = "Stored files")),
    tag = "organizations"
)]
pub async fn list_files(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Vec<StoredFile>>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    Ok(Json(state.ledger().files(org)))
}

/// POST /v1/organizations/{id}/files
#[utoipa::path(
    post,
    path = "/v1/organizations/{id}/files",
    params(("id" = String, Path, description = "Organization ID")),
    request_body = AddFileRequest,
    responses(
        (status = 201, description = "File recorded"),
        (status = 403, description = "LIMIT_EXCEEDED on storage", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn add_file(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<AddFileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredFile>), AppError> {
    let org = member_org(&state, &caller, &id)?;
    let req = extract_validated_json(body)?;
    let file = within_limits(
        state
            .store
            .add_file_within_limits(org, &req.name, req.size_bytes)
            .await,
    )?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// DELETE /v1/organizations/{id}/files/{file_id}
#[utoipa::path(
    delete,
    path = "/v1/organizations/{id}/files/{file_id}",
    params(
        ("id" = String, Path, description = "Organization ID"),
        ("file_id" = String, Path, description = "File ID"),
    ),
    responses(
        (status = 200, description = "File removed"),
        (status = 404, description = "No such file in this organization", body = crate::error::ErrorBody),
    ),
    tag = "organizations"
)]
pub async fn remove_file(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<StoredFile>, AppError> {
    let org = member_org(&state, &caller, &id)?;
    let file: FileId = parse_path(&file_id)?;
    if !state.ledger().files(org).iter().any(|f| f.id == file) {
        return Err(AppError::NotFound(format!("file {file} not found")));
    }
    Ok(Json(state.store.remove_file(file).await?))
}
