//! # Organizational Limit Checker
//!
//! Two operations with different comparisons:
//!
//! - [`check_organization_limits`](EntitlementResolver::check_organization_limits)
//!   reports the current state: `allowed = current <= limit`.
//! - [`can_perform_action`](EntitlementResolver::can_perform_action) is the
//!   check-before-create gate: `allowed = current + increment <= limit`.
//!
//! An organization at exactly its limit is therefore "allowed" by the
//! report and refused by the gate. Creation paths call the gate.
//!
//! `objects`, `sectors`, `articles` and `tasks` have no backing counter:
//! they always report `current = 0` and no limit.

use serde::{Deserialize, Serialize};

use caboard_core::{LimitDimension, OrganizationId, ValidationError};

use crate::directory::TenantDirectory;
use crate::error::EntitlementError;
use crate::resolver::EntitlementResolver;

/// Usage of one dimension against the effective plan's limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStatus {
    pub dimension: LimitDimension,
    pub current: u64,
    pub limit: Option<u64>,
    pub unlimited: bool,
    pub allowed: bool,
    /// `round(current * 100 / limit)`; 0 when unlimited, 100 when the limit is 0.
    pub percentage: u64,
    /// Headroom left, saturating at 0. `None` when unlimited.
    pub remaining: Option<u64>,
}

impl LimitStatus {
    /// Build the status report for `current` against `limit`.
    pub fn report(dimension: LimitDimension, current: u64, limit: Option<u64>) -> Self {
        Self {
            dimension,
            current,
            limit,
            unlimited: limit.is_none(),
            allowed: limit.map_or(true, |l| current <= l),
            percentage: percentage(current, limit),
            remaining: limit.map(|l| l.saturating_sub(current)),
        }
    }
}

/// Outcome of a check-before-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCheck {
    pub dimension: LimitDimension,
    pub current: u64,
    pub increment: u64,
    pub limit: Option<u64>,
    pub allowed: bool,
}

/// `current + increment <= limit`, with `None` unlimited.
pub fn action_allowed(current: u64, increment: u64, limit: Option<u64>) -> bool {
    match limit {
        None => true,
        Some(limit) => current
            .checked_add(increment)
            .is_some_and(|total| total <= limit),
    }
}

fn percentage(current: u64, limit: Option<u64>) -> u64 {
    match limit {
        None => 0,
        Some(0) => 100,
        Some(limit) => {
            let (current, limit) = (u128::from(current), u128::from(limit));
            let rounded = (current * 100 + limit / 2) / limit;
            u64::try_from(rounded).unwrap_or(u64::MAX)
        }
    }
}

impl<D: TenantDirectory + ?Sized> EntitlementResolver<'_, D> {
    /// Current usage of `dimension` against the effective plan.
    pub fn check_organization_limits(
        &self,
        organization: OrganizationId,
        dimension: LimitDimension,
    ) -> Result<LimitStatus, EntitlementError> {
        self.require_organization(organization)?;
        let limit = self
            .resolve_effective_plan(organization)?
            .plan
            .limit_for(dimension);
        let current = self.current_usage(organization, dimension)?;
        Ok(LimitStatus::report(dimension, current, limit))
    }

    /// Whether `increment` more units of `dimension` fit under the limit.
    pub fn can_perform_action(
        &self,
        organization: OrganizationId,
        dimension: LimitDimension,
        increment: u64,
    ) -> Result<ActionCheck, EntitlementError> {
        if increment == 0 {
            return Err(ValidationError::ZeroIncrement {
                dimension: dimension.to_string(),
            }
            .into());
        }
        self.require_organization(organization)?;
        let limit = self
            .resolve_effective_plan(organization)?
            .plan
            .limit_for(dimension);
        let current = self.current_usage(organization, dimension)?;
        let allowed = action_allowed(current, increment, limit);
        if !allowed {
            tracing::info!(
                organization = %organization,
                dimension = %dimension,
                current,
                increment,
                limit = ?limit,
                "action refused: plan limit reached"
            );
        }
        Ok(ActionCheck {
            dimension,
            current,
            increment,
            limit,
            allowed,
        })
    }

    /// Status of every dimension.
    pub fn organization_usage(
        &self,
        organization: OrganizationId,
    ) -> Result<Vec<LimitStatus>, EntitlementError> {
        self.require_organization(organization)?;
        let plan = self.resolve_effective_plan(organization)?.plan;
        LimitDimension::all()
            .iter()
            .map(|&dimension| {
                let current = self.current_usage(organization, dimension)?;
                Ok(LimitStatus::report(
                    dimension,
                    current,
                    plan.limit_for(dimension),
                ))
            })
            .collect()
    }

    fn require_organization(&self, organization: OrganizationId) -> Result<(), EntitlementError> {
        if self.directory.organization_exists(organization)? {
            Ok(())
        } else {
            Err(EntitlementError::OrganizationNotFound(organization))
        }
    }

    fn current_usage(
        &self,
        organization: OrganizationId,
        dimension: LimitDimension,
    ) -> Result<u64, EntitlementError> {
        if !dimension.is_counted() {
            return Ok(0);
        }
        Ok(self.directory.usage(organization, dimension)?)
    }
}
