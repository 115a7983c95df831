//! # Plan Tiers
//!
//! The closed set of subscription tiers. Plan identity is compared through
//! this enum only; there are no `"PREMIUM"` string comparisons anywhere
//! past the parsing boundary.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// Subscription tier of a plan.
///
/// | Tier | Meaning |
/// |------|---------|
/// | `FREE` | Fallback tier for organizations without a live subscription |
/// | `PREMIUM` | Paid tier |
/// | `ILLIMITE` | Paid tier without numeric limits |
/// | `SUPER_ADMIN` | Internal operator tier, every feature |
/// | `CUSTOM` | Negotiated plan; features follow its own flags |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    /// Fallback tier.
    Free,
    /// Paid tier.
    Premium,
    /// Internal operator tier.
    SuperAdmin,
    /// Paid tier without numeric limits.
    Illimite,
    /// Negotiated plan.
    Custom,
}

impl PlanTier {
    /// Every tier, in catalog order.
    pub fn all() -> &'static [PlanTier] {
        &[
            Self::Free,
            Self::Premium,
            Self::SuperAdmin,
            Self::Illimite,
            Self::Custom,
        ]
    }

    /// Canonical upper-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Premium => "PREMIUM",
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Illimite => "ILLIMITE",
            Self::Custom => "CUSTOM",
        }
    }

    /// Whether this tier is paid for (anything but FREE).
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(Self::Free),
            "PREMIUM" => Ok(Self::Premium),
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "ILLIMITE" => Ok(Self::Illimite),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(ValidationError::UnknownTier(other.to_string())),
        }
    }
}
