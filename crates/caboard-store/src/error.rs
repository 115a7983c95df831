use thiserror::Error;

use caboard_core::ValidationError;
use caboard_entitlements::{ActionCheck, EntitlementError};
use caboard_state::SubscriptionError;

/// Errors raised by the tenant ledger and its persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The mutation would violate a uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A subscription transition was refused by the lifecycle.
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// A limit-checked creation found no room under the plan.
    #[error("{} limit reached: {} of {:?} in use", .0.dimension, .0.current, .0.limit)]
    LimitExceeded(ActionCheck),

    /// Reference data is missing (e.g., no plan for a tier).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The database rejected or failed a write. The in-memory change was
    /// rolled back.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Snapshot file could not be read or written.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<EntitlementError> for StoreError {
    fn from(e: EntitlementError) -> Self {
        match e {
            EntitlementError::OrganizationNotFound(id) => Self::not_found("organization", id),
            EntitlementError::Validation(v) => Self::Validation(v),
            EntitlementError::Configuration(_) | EntitlementError::Directory(_) => {
                Self::Configuration(e.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}
