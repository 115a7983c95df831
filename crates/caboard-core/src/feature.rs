//! # Gated Features
//!
//! Every capability that depends on the organization's plan. The
//! requirement table lives in `caboard-entitlements`; adding a variant here
//! breaks its exhaustive `match` until the requirement is declared.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// A plan-gated capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Payroll entry, Gastrotime imports and payroll dashboards.
    Payroll,
    /// CSV/XLSX report export.
    Export,
    /// Consolidated dashboard across several mandates.
    MultiMandateDashboard,
    /// Advanced reporting (comparisons, projections).
    AdvancedReports,
    /// Programmatic API access.
    ApiAccess,
    /// Organization logo and colours on exports.
    CustomBranding,
}

impl Feature {
    /// Every feature, in canonical order.
    pub fn all() -> &'static [Feature] {
        &[
            Self::Payroll,
            Self::Export,
            Self::MultiMandateDashboard,
            Self::AdvancedReports,
            Self::ApiAccess,
            Self::CustomBranding,
        ]
    }

    /// Canonical snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payroll => "payroll",
            Self::Export => "export",
            Self::MultiMandateDashboard => "multi_mandate_dashboard",
            Self::AdvancedReports => "advanced_reports",
            Self::ApiAccess => "api_access",
            Self::CustomBranding => "custom_branding",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payroll" => Ok(Self::Payroll),
            "export" => Ok(Self::Export),
            "multi_mandate_dashboard" => Ok(Self::MultiMandateDashboard),
            "advanced_reports" => Ok(Self::AdvancedReports),
            "api_access" => Ok(Self::ApiAccess),
            "custom_branding" => Ok(Self::CustomBranding),
            other => Err(ValidationError::UnknownFeature(other.to_string())),
        }
    }
}
