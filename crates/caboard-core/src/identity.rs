//! # Tenant Identity Newtypes
//!
//! Newtype wrappers for every identifier in caboard. These prevent
//! accidental identifier confusion: a `MandateId` cannot be passed where an
//! `OrganizationId` is expected.
//!
//! ## Tenant Isolation
//!
//! Type-level distinction between identifier namespaces is the first line
//! of multi-tenant isolation. Every lookup that crosses a tenant boundary
//! (user -> organization, mandate -> organization) is an explicit function
//! with a typed signature.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            /// Accepts a bare UUID or the prefixed `Display` form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw).map(Self).map_err(|e| {
                    ValidationError::Invalid(format!(
                        concat!("invalid ", $prefix, " id {:?}: {}"),
                        s, e
                    ))
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_newtype!(
    /// Unique identifier for a tenant organization.
    OrganizationId,
    "organization"
);

uuid_newtype!(
    /// Unique identifier for a user account.
    UserId,
    "user"
);

uuid_newtype!(
    /// Unique identifier for a mandate (hotel, restaurant, any establishment).
    MandateId,
    "mandate"
);

uuid_newtype!(
    /// Unique identifier for a plan in the catalog.
    PlanId,
    "plan"
);

uuid_newtype!(
    /// Unique identifier for a subscription row.
    SubscriptionId,
    "subscription"
);

uuid_newtype!(
    /// Unique identifier for one day's revenue entry.
    DayValueId,
    "day_value"
);

uuid_newtype!(
    /// Unique identifier for an employee of a mandate.
    EmployeeId,
    "employee"
);

uuid_newtype!(
    /// Unique identifier for a stored file counted against storage.
    FileId,
    "file"
);
