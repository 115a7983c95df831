//! # Limit Dimensions
//!
//! Resources whose usage an organization's plan may cap.
//!
//! Only `users`, `mandates` and `storage` have usage counters and plan
//! limits. `objects`, `sectors`, `articles` and `tasks` are declared so that
//! callers can already ask about them; their usage always reads as 0 and
//! they carry no limit.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// A resource dimension subject to plan limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitDimension {
    /// Organization memberships.
    Users,
    /// Mandates owned by the organization.
    Mandates,
    /// Stored bytes across the organization's uploads.
    Storage,
    /// Not counted.
    Objects,
    /// Not counted.
    Sectors,
    /// Not counted.
    Articles,
    /// Not counted.
    Tasks,
}

impl LimitDimension {
    /// Every dimension, in canonical order.
    pub fn all() -> &'static [LimitDimension] {
        &[
            Self::Users,
            Self::Mandates,
            Self::Storage,
            Self::Objects,
            Self::Sectors,
            Self::Articles,
            Self::Tasks,
        ]
    }

    /// Canonical snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Mandates => "mandates",
            Self::Storage => "storage",
            Self::Objects => "objects",
            Self::Sectors => "sectors",
            Self::Articles => "articles",
            Self::Tasks => "tasks",
        }
    }

    /// Whether usage is actually counted for this dimension.
    pub fn is_counted(&self) -> bool {
        matches!(self, Self::Users | Self::Mandates | Self::Storage)
    }
}

impl std::fmt::Display for LimitDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitDimension {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Self::Users),
            "mandates" => Ok(Self::Mandates),
            "storage" => Ok(Self::Storage),
            "objects" => Ok(Self::Objects),
            "sectors" => Ok(Self::Sectors),
            "articles" => Ok(Self::Articles),
            "tasks" => Ok(Self::Tasks),
            other => Err(ValidationError::UnknownDimension(other.to_string())),
        }
    }
}
