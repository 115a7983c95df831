//! # Request Gates
//!
//! Checks handlers run before touching tenant data: the caller must belong
//! to the organization they address, and gated features must be on the
//! plan. Creations are held to the plan's limits by the store itself, in
//! the same write section as the insert; [`within_limits`] maps a refusal.
//!
//! A caller addressing another tenant's organization or mandate gets
//! `404`, the same answer as for one that does not exist.

use caboard_core::{Feature, MandateId, OrganizationId};
use caboard_entitlements::TenantDirectory;
use caboard_store::{Mandate, StoreError};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::middleware::metrics::{record_feature_denial, record_limit_refusal};
use crate::state::AppState;

/// The caller must be a member of `organization`.
pub fn require_member(
    state: &AppState,
    caller: &CallerIdentity,
    organization: OrganizationId,
) -> Result<(), AppError> {
    let own = state
        .ledger()
        .organization_of_user(caller.user_id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if own == Some(organization) {
        Ok(())
    } else {
        tracing::debug!(user = %caller.user_id, organization = %organization, "cross-tenant access refused");
        Err(AppError::NotFound(format!("organization {organization} not found")))
    }
}

/// The mandate, provided the caller belongs to its organization.
pub fn mandate_for_caller(
    state: &AppState,
    caller: &CallerIdentity,
    mandate: MandateId,
) -> Result<Mandate, AppError> {
    let found = state.ledger().mandate(mandate)?;
    require_member(state, caller, found.organization_id)
        .map_err(|_| AppError::NotFound(format!("mandate {mandate} not found")))?;
    Ok(found)
}

/// The caller's plan must include `feature`.
pub fn require_feature(
    state: &AppState,
    caller: &CallerIdentity,
    feature: Feature,
) -> Result<(), AppError> {
    match state.entitlements(|r| r.denial(caller.user_id, feature))? {
        None => Ok(()),
        Some(denial) => {
            record_feature_denial(feature);
            Err(AppError::FeatureNotAvailable(denial))
        }
    }
}

/// Result of a limit-checked creation, with a refusal counted and mapped
/// to `403 LIMIT_EXCEEDED`.
pub fn within_limits<T>(result: Result<T, StoreError>) -> Result<T, AppError> {
    result.map_err(|err| {
        if let StoreError::LimitExceeded(check) = &err {
            record_limit_refusal(check.dimension);
        }
        err.into()
    })
}
