//! # Entitlement Errors
//!
//! Denial is not an error. A user without access gets `false`, an
//! organization over its limit gets `allowed: false`. The variants here are
//! caller bugs, missing tenants, broken reference data, or an unavailable
//! backing store.

use thiserror::Error;

use caboard_core::{OrganizationId, ValidationError};

use crate::directory::DirectoryError;

/// Errors raised while resolving entitlements.
#[derive(Error, Debug)]
pub enum EntitlementError {
    /// The organization does not exist.
    #[error("organization {0} not found")]
    OrganizationNotFound(OrganizationId),

    /// Reference data is missing or inconsistent (e.g., no FREE plan).
    /// Not recoverable at request time.
    #[error("plan catalog misconfigured: {0}")]
    Configuration(String),

    /// Malformed feature, dimension, or increment.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The tenant directory failed to answer.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
