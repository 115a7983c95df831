//! Plan catalog seeding.

use caboard_entitlements::Plan;

use crate::change::{ChangeSet, Row};
use crate::error::StoreError;
use crate::ledger::Ledger;

impl Ledger {
    /// Insert or update plans, matching existing rows by name.
    ///
    /// A plan whose name is already in the catalog keeps its stored id so
    /// subscriptions that reference it stay valid; seeding the same
    /// catalog twice changes nothing.
    pub fn seed_plans(&self, plans: Vec<Plan>) -> Result<(Vec<Plan>, ChangeSet), StoreError> {
        self.write(|w| {
            let mut seeded = Vec::with_capacity(plans.len());
            for mut plan in plans {
                if let Some(existing) = w.tables().catalog.plans().iter().find(|p| p.name == plan.name) {
                    plan.id = existing.id;
                    if *existing == plan {
                        seeded.push(plan);
                        continue;
                    }
                }
                tracing::info!(plan = %plan.name, tier = %plan.tier, "seeding plan");
                w.put(Row::Plan(plan.clone()));
                seeded.push(plan);
            }
            Ok(seeded)
        })
    }
}

#[cfg(test)]
mod tests {
    use caboard_core::PlanTier;
    use caboard_entitlements::PlanCatalog;

    use super::*;

    #[test]
    fn seeding_an_empty_ledger_adds_every_plan() {
        let ledger = Ledger::default();
        let defaults = PlanCatalog::defaults();
        let (seeded, changes) = ledger.seed_plans(defaults.plans().to_vec()).unwrap();
        assert_eq!(seeded.len(), defaults.len());
        assert_eq!(changes.applied().len(), defaults.len());
        assert!(ledger.catalog().free().is_ok());
    }

    #[test]
    fn reseeding_keeps_ids_and_is_a_no_op() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let free_id = ledger.catalog().free().unwrap().id;

        // Fresh ids, same names.
        let (_, changes) = ledger.seed_plans(PlanCatalog::defaults().plans().to_vec()).unwrap();
        assert!(changes.is_empty());
        assert_eq!(ledger.catalog().free().unwrap().id, free_id);
    }

    #[test]
    fn reseeding_updates_changed_limits_in_place() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let premium_id = ledger.catalog().by_tier(PlanTier::Premium).unwrap().id;

        let mut plans = PlanCatalog::defaults().plans().to_vec();
        for p in plans.iter_mut().filter(|p| p.tier == PlanTier::Premium) {
            p.max_users = Some(50);
        }
        let (_, changes) = ledger.seed_plans(plans).unwrap();
        assert_eq!(changes.applied().len(), 1);

        let catalog = ledger.catalog();
        let premium = catalog.by_tier(PlanTier::Premium).unwrap();
        assert_eq!(premium.id, premium_id);
        assert_eq!(premium.max_users, Some(50));
    }
}
