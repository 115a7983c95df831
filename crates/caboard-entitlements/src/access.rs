//! # Feature Access Evaluator
//!
//! `(user, feature) -> allow/deny`. The user's organization is resolved,
//! then its effective plan, then the static requirement table below.
//!
//! | Feature | Requirement |
//! |---|---|
//! | `payroll` | tier ∈ {PREMIUM, SUPER_ADMIN, ILLIMITE} |
//! | `export` | tier ∈ {PREMIUM, SUPER_ADMIN, ILLIMITE, CUSTOM} |
//! | `multi_mandate_dashboard` | tier ∈ {PREMIUM, SUPER_ADMIN, ILLIMITE, CUSTOM} |
//! | `advanced_reports` | `has_advanced_reports` (SUPER_ADMIN always) |
//! | `api_access` | `has_api_access` (SUPER_ADMIN always) |
//! | `custom_branding` | `has_custom_branding` (SUPER_ADMIN always) |
//!
//! Denial is a value. A user without organization, an unknown feature name
//! and an insufficient plan all yield `false`. Only directory failures and
//! a broken catalog surface as errors.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use caboard_core::{Feature, OrganizationId, PlanTier, UserId};

use crate::catalog::{Plan, PlanCatalog};
use crate::directory::TenantDirectory;
use crate::error::EntitlementError;
use crate::resolver::EntitlementResolver;

/// Boolean plan column consulted by flag-gated features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFlag {
    AdvancedReports,
    ApiAccess,
    CustomBranding,
}

impl PlanFlag {
    fn read(self, plan: &Plan) -> bool {
        match self {
            Self::AdvancedReports => plan.has_advanced_reports,
            Self::ApiAccess => plan.has_api_access,
            Self::CustomBranding => plan.has_custom_branding,
        }
    }
}

/// What a plan must satisfy to unlock a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureRequirement {
    /// Effective tier must be one of these.
    Tiers(&'static [PlanTier]),
    /// Plan flag must be set; SUPER_ADMIN bypasses.
    PlanFlag(PlanFlag),
}

const PAYROLL_TIERS: &[PlanTier] = &[PlanTier::Premium, PlanTier::SuperAdmin, PlanTier::Illimite];

const PAID_TIERS: &[PlanTier] = &[
    PlanTier::Premium,
    PlanTier::SuperAdmin,
    PlanTier::Illimite,
    PlanTier::Custom,
];

/// Requirement for `feature`.
pub fn requirement(feature: Feature) -> FeatureRequirement {
    match feature {
        Feature::Payroll => FeatureRequirement::Tiers(PAYROLL_TIERS),
        Feature::Export | Feature::MultiMandateDashboard => FeatureRequirement::Tiers(PAID_TIERS),
        Feature::AdvancedReports => FeatureRequirement::PlanFlag(PlanFlag::AdvancedReports),
        Feature::ApiAccess => FeatureRequirement::PlanFlag(PlanFlag::ApiAccess),
        Feature::CustomBranding => FeatureRequirement::PlanFlag(PlanFlag::CustomBranding),
    }
}

/// Whether `plan` unlocks `feature`.
pub fn feature_allowed(plan: &Plan, feature: Feature) -> bool {
    match requirement(feature) {
        FeatureRequirement::Tiers(tiers) => tiers.contains(&plan.tier),
        FeatureRequirement::PlanFlag(flag) => plan.tier == PlanTier::SuperAdmin || flag.read(plan),
    }
}

/// Tiers that would unlock `feature` under `catalog`, in tier order.
pub fn required_tiers(catalog: &PlanCatalog, feature: Feature) -> Vec<PlanTier> {
    PlanTier::all()
        .iter()
        .copied()
        .filter(|tier| match requirement(feature) {
            FeatureRequirement::Tiers(tiers) => tiers.contains(tier),
            FeatureRequirement::PlanFlag(_) => catalog
                .by_tier(*tier)
                .is_some_and(|plan| feature_allowed(plan, feature)),
        })
        .collect()
}

/// Why a feature was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The user is not a member of any organization.
    NoOrganization,
    /// The effective plan does not meet the requirement.
    InsufficientPlan,
}

/// Structured denial, rendered by callers as an upgrade prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDenial {
    pub feature: Feature,
    pub reason: DenialReason,
    pub required_tiers: Vec<PlanTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tier: Option<PlanTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_url: Option<String>,
}

/// One row of a [`FeatureAccessReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAccess {
    pub feature: Feature,
    pub allowed: bool,
}

/// Allow/deny for every feature at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAccessReport {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<PlanTier>,
    pub features: Vec<FeatureAccess>,
}

impl<D: TenantDirectory + ?Sized> EntitlementResolver<'_, D> {
    /// Whether `user` may use `feature`.
    pub fn has_feature_access(
        &self,
        user: UserId,
        feature: Feature,
    ) -> Result<bool, EntitlementError> {
        Ok(self.denial(user, feature)?.is_none())
    }

    /// [`has_feature_access`](Self::has_feature_access) for a raw feature
    /// name. Unknown names are denied.
    pub fn has_feature_access_named(
        &self,
        user: UserId,
        feature: &str,
    ) -> Result<bool, EntitlementError> {
        match Feature::from_str(feature) {
            Ok(feature) => self.has_feature_access(user, feature),
            Err(_) => {
                tracing::debug!(user = %user, feature, "unknown feature name denied");
                Ok(false)
            }
        }
    }

    /// `None` when `user` may use `feature`; the structured reason otherwise.
    pub fn denial(
        &self,
        user: UserId,
        feature: Feature,
    ) -> Result<Option<FeatureDenial>, EntitlementError> {
        let deny = |reason, current_tier| FeatureDenial {
            feature,
            reason,
            required_tiers: required_tiers(self.catalog, feature),
            current_tier,
            upgrade_url: self.upgrade_url.clone(),
        };

        let Some(organization) = self.directory.organization_of_user(user)? else {
            tracing::debug!(user = %user, feature = %feature, "feature denied: no organization");
            return Ok(Some(deny(DenialReason::NoOrganization, None)));
        };

        let effective = self.resolve_effective_plan(organization)?;
        if feature_allowed(&effective.plan, feature) {
            return Ok(None);
        }
        tracing::debug!(
            user = %user,
            organization = %organization,
            feature = %feature,
            tier = %effective.tier,
            "feature denied: insufficient plan"
        );
        Ok(Some(deny(DenialReason::InsufficientPlan, Some(effective.tier))))
    }

    /// Access to every feature for `user`.
    pub fn feature_access_report(
        &self,
        user: UserId,
    ) -> Result<FeatureAccessReport, EntitlementError> {
        let Some(organization) = self.directory.organization_of_user(user)? else {
            return Ok(FeatureAccessReport {
                user_id: user,
                organization_id: None,
                tier: None,
                features: Feature::all()
                    .iter()
                    .map(|&feature| FeatureAccess {
                        feature,
                        allowed: false,
                    })
                    .collect(),
            });
        };

        let effective = self.resolve_effective_plan(organization)?;
        Ok(FeatureAccessReport {
            user_id: user,
            organization_id: Some(organization),
            tier: Some(effective.tier),
            features: Feature::all()
                .iter()
                .map(|&feature| FeatureAccess {
                    feature,
                    allowed: feature_allowed(&effective.plan, feature),
                })
                .collect(),
        })
    }
}
