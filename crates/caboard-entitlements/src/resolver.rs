//! # Subscription Resolver
//!
//! `effective_plan: subscription -> plan`, with one documented fallback:
//!
//! | Current subscription | Effective plan | `is_active` |
//! |---|---|---|
//! | none | FREE | false |
//! | status ∉ {ACTIVE, TRIALING} | FREE | false |
//! | plan id not in catalog | FREE | false |
//! | status ∈ {ACTIVE, TRIALING} | subscription's plan | true |
//!
//! The validity window is not consulted. A subscription whose period ended
//! keeps granting its plan until its status is transitioned.
//!
//! A catalog without a FREE plan is a [`EntitlementError::Configuration`].

use serde::{Deserialize, Serialize};

use caboard_core::{OrganizationId, PlanId, PlanTier, SubscriptionId};
use caboard_state::Subscription;

use crate::catalog::{Plan, PlanCatalog};
use crate::directory::TenantDirectory;
use crate::error::EntitlementError;

/// Why an organization ended up on the FREE fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No subscription row.
    NoSubscription,
    /// Subscription status does not grant its plan.
    InactiveStatus,
    /// Subscription references a plan the catalog does not contain.
    UnknownPlan,
}

/// The plan an organization is entitled to right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePlan {
    /// Identifier of the effective plan.
    pub plan_id: PlanId,
    /// Tier of the effective plan.
    pub tier: PlanTier,
    /// Whether a live subscription grants this plan.
    pub is_active: bool,
    /// Subscription that granted (or failed to grant) a plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<SubscriptionId>,
    /// Set when the FREE fallback applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
    /// Full plan definition.
    pub plan: Plan,
}

/// Resolve the effective plan from an organization's current subscription.
pub fn effective_plan(
    subscription: Option<&Subscription>,
    catalog: &PlanCatalog,
) -> Result<EffectivePlan, EntitlementError> {
    let fallback = match subscription {
        None => FallbackReason::NoSubscription,
        Some(sub) if !sub.grants_plan() => FallbackReason::InactiveStatus,
        Some(sub) => match catalog.by_id(sub.plan_id) {
            Some(plan) => {
                return Ok(EffectivePlan {
                    plan_id: plan.id,
                    tier: plan.tier,
                    is_active: true,
                    subscription_id: Some(sub.id),
                    fallback: None,
                    plan: plan.clone(),
                });
            }
            None => {
                tracing::warn!(
                    subscription = %sub.id,
                    plan = %sub.plan_id,
                    "subscription references a plan missing from the catalog"
                );
                FallbackReason::UnknownPlan
            }
        },
    };

    let free = catalog.free()?;
    Ok(EffectivePlan {
        plan_id: free.id,
        tier: free.tier,
        is_active: false,
        subscription_id: subscription.map(|s| s.id),
        fallback: Some(fallback),
        plan: free.clone(),
    })
}

/// Entitlement resolution over a tenant directory and a plan catalog.
///
/// Stateless: every call reads the directory afresh. The feature and limit
/// operations live in `access.rs` and `limits.rs`.
#[derive(Debug)]
pub struct EntitlementResolver<'a, D: ?Sized> {
    pub(crate) directory: &'a D,
    pub(crate) catalog: &'a PlanCatalog,
    pub(crate) upgrade_url: Option<String>,
}

impl<'a, D: TenantDirectory + ?Sized> EntitlementResolver<'a, D> {
    /// Create a resolver.
    pub fn new(directory: &'a D, catalog: &'a PlanCatalog) -> Self {
        Self {
            directory,
            catalog,
            upgrade_url: None,
        }
    }

    /// Attach the billing page URL reported with feature denials.
    pub fn with_upgrade_url(mut self, url: impl Into<String>) -> Self {
        self.upgrade_url = Some(url.into());
        self
    }

    /// The catalog this resolver reads.
    pub fn catalog(&self) -> &PlanCatalog {
        self.catalog
    }

    /// Resolve the organization's effective plan.
    ///
    /// Organization existence is not checked here; an unknown organization
    /// simply has no subscription.
    pub fn resolve_effective_plan(
        &self,
        organization: OrganizationId,
    ) -> Result<EffectivePlan, EntitlementError> {
        let subscription = self.directory.current_subscription(organization)?;
        let resolved = effective_plan(subscription.as_ref(), self.catalog)?;
        if let Some(reason) = resolved.fallback {
            tracing::debug!(
                organization = %organization,
                reason = ?reason,
                "effective plan fell back to FREE"
            );
        }
        Ok(resolved)
    }
}
