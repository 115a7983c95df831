//! # Plan Catalog
//!
//! Reference data describing every subscription tier: numeric limits
//! (`None` means unlimited) and boolean feature flags.
//!
//! The catalog is seeded administratively, either from
//! [`PlanCatalog::defaults()`] or from a YAML document
//! ([`PlanCatalog::from_yaml()`]), and persisted by `caboard-store`. It is
//! immutable at request time.
//!
//! ## YAML format
//!
//! ```yaml
//! plans:
//!   - tier: FREE
//!     name: Free
//!     max_users: 1
//!     max_mandates: 1
//!     max_storage_mb: 100
//!   - tier: ILLIMITE
//!     name: Illimité
//!     has_advanced_reports: true
//! ```

use serde::{Deserialize, Serialize};

use caboard_core::{LimitDimension, PlanId, PlanTier};

use crate::error::EntitlementError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Catalog identifier.
    #[serde(default)]
    pub id: PlanId,
    /// Tier this plan belongs to.
    pub tier: PlanTier,
    /// Display name, unique within the catalog.
    pub name: String,
    /// Maximum organization memberships. `None` is unlimited.
    #[serde(default)]
    pub max_users: Option<u64>,
    /// Maximum mandates. `None` is unlimited.
    #[serde(default)]
    pub max_mandates: Option<u64>,
    /// Maximum storage in megabytes. `None` is unlimited.
    #[serde(default)]
    pub max_storage_mb: Option<u64>,
    /// Advanced reporting enabled.
    #[serde(default)]
    pub has_advanced_reports: bool,
    /// API access enabled.
    #[serde(default)]
    pub has_api_access: bool,
    /// Custom branding enabled.
    #[serde(default)]
    pub has_custom_branding: bool,
    /// Offered for new subscriptions.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Plan {
    /// Limit for `dimension` in the dimension's own unit (count or bytes).
    ///
    /// Storage limits are stored in megabytes and converted here. Dimensions
    /// without a plan column are unlimited.
    pub fn limit_for(&self, dimension: LimitDimension) -> Option<u64> {
        match dimension {
            LimitDimension::Users => self.max_users,
            LimitDimension::Mandates => self.max_mandates,
            LimitDimension::Storage => self
                .max_storage_mb
                .map(|mb| mb.saturating_mul(BYTES_PER_MB)),
            LimitDimension::Objects
            | LimitDimension::Sectors
            | LimitDimension::Articles
            | LimitDimension::Tasks => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    plans: Vec<Plan>,
}

/// The full set of plans known to the system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// Build a catalog, rejecting duplicate ids or names.
    pub fn new(plans: Vec<Plan>) -> Result<Self, EntitlementError> {
        for (i, plan) in plans.iter().enumerate() {
            for other in &plans[..i] {
                if other.id == plan.id {
                    return Err(EntitlementError::Configuration(format!(
                        "duplicate plan id {}",
                        plan.id
                    )));
                }
                if other.name == plan.name {
                    return Err(EntitlementError::Configuration(format!(
                        "duplicate plan name {:?}",
                        plan.name
                    )));
                }
            }
        }
        Ok(Self { plans })
    }

    /// Parse a YAML catalog document.
    pub fn from_yaml(source: &str) -> Result<Self, EntitlementError> {
        let doc: CatalogDocument = serde_yaml::from_str(source)
            .map_err(|e| EntitlementError::Configuration(format!("invalid plan catalog: {e}")))?;
        Self::new(doc.plans)
    }

    /// Built-in catalog used when no catalog file is configured.
    pub fn defaults() -> Self {
        let plan = |tier, name: &str, users, mandates, storage, reports, api, branding| Plan {
            id: PlanId::new(),
            tier,
            name: name.to_string(),
            max_users: users,
            max_mandates: mandates,
            max_storage_mb: storage,
            has_advanced_reports: reports,
            has_api_access: api,
            has_custom_branding: branding,
            active: true,
        };
        Self {
            plans: vec![
                plan(PlanTier::Free, "Free", Some(1), Some(1), Some(100), false, false, false),
                plan(PlanTier::Premium, "Premium", Some(5), Some(5), Some(1024), true, false, false),
                plan(PlanTier::Illimite, "Illimité", None, None, None, true, true, true),
                plan(PlanTier::SuperAdmin, "Super Admin", None, None, None, true, true, true),
                plan(PlanTier::Custom, "Custom", Some(20), Some(20), Some(5120), true, true, false),
            ],
        }
    }

    /// Every plan, in catalog order.
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Look up a plan by identifier.
    pub fn by_id(&self, id: PlanId) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    /// First active plan of `tier`, falling back to any plan of that tier.
    pub fn by_tier(&self, tier: PlanTier) -> Option<&Plan> {
        self.plans
            .iter()
            .find(|p| p.tier == tier && p.active)
            .or_else(|| self.plans.iter().find(|p| p.tier == tier))
    }

    /// The FREE reference plan.
    ///
    /// Its absence is a configuration error with no further fallback.
    pub fn free(&self) -> Result<&Plan, EntitlementError> {
        self.by_tier(PlanTier::Free).ok_or_else(|| {
            EntitlementError::Configuration("FREE plan missing from catalog".to_string())
        })
    }

    /// Insert or replace a plan (matched by id).
    pub fn upsert(&mut self, plan: Plan) {
        match self.plans.iter_mut().find(|p| p.id == plan.id) {
            Some(existing) => *existing = plan,
            None => self.plans.push(plan),
        }
    }

    /// Remove a plan, returning it if present.
    pub fn remove(&mut self, id: PlanId) -> Option<Plan> {
        let index = self.plans.iter().position(|p| p.id == id)?;
        Some(self.plans.remove(index))
    }

    /// Number of plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the catalog has no plans.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
