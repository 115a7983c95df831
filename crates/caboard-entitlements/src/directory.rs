//! # Tenant Directory
//!
//! The read-only view of tenant data the resolver needs. `caboard-store`
//! implements it over its in-memory ledger; tests implement it over a
//! handful of fixtures.

use thiserror::Error;

use caboard_core::{LimitDimension, OrganizationId, UserId};
use caboard_state::Subscription;

/// Opaque failure of the backing store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tenant directory unavailable: {0}")]
pub struct DirectoryError(pub String);

/// Tenant lookups required by entitlement resolution.
pub trait TenantDirectory {
    /// Whether the organization exists.
    fn organization_exists(&self, organization: OrganizationId) -> Result<bool, DirectoryError>;

    /// The organization the user belongs to, if any.
    fn organization_of_user(&self, user: UserId) -> Result<Option<OrganizationId>, DirectoryError>;

    /// The organization's current (most recent, non-superseded) subscription.
    fn current_subscription(
        &self,
        organization: OrganizationId,
    ) -> Result<Option<Subscription>, DirectoryError>;

    /// Realised usage of a counted dimension, in the dimension's unit.
    fn usage(
        &self,
        organization: OrganizationId,
        dimension: LimitDimension,
    ) -> Result<u64, DirectoryError>;
}
