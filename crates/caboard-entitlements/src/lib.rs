//! # caboard-entitlements
//!
//! Access-control and plan-limit resolution for multi-tenant organizations.
//!
//! - [`catalog`]: plan definitions (limits and feature flags).
//! - [`resolver`]: subscription to effective plan, with the FREE fallback.
//! - [`access`]: `(user, feature) -> allow/deny`.
//! - [`limits`]: usage reports and the check-before-create gate.
//!
//! Every operation reads through a [`TenantDirectory`] and holds no state
//! of its own.

pub mod access;
pub mod catalog;
pub mod directory;
pub mod error;
pub mod limits;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use access::{
    feature_allowed, required_tiers, requirement, DenialReason, FeatureAccess,
    FeatureAccessReport, FeatureDenial, FeatureRequirement, PlanFlag,
};
pub use catalog::{Plan, PlanCatalog};
pub use directory::{DirectoryError, TenantDirectory};
pub use error::EntitlementError;
pub use limits::{action_allowed, ActionCheck, LimitStatus};
pub use resolver::{effective_plan, EffectivePlan, EntitlementResolver, FallbackReason};
