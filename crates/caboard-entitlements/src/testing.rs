//! In-memory tenant directory for unit tests.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use caboard_core::{
    LimitDimension, OrganizationId, PlanId, PlanTier, SubscriptionId, Timestamp, UserId,
};
use caboard_state::{Subscription, SubscriptionStatus};

use crate::catalog::PlanCatalog;
use crate::directory::{DirectoryError, TenantDirectory};
use crate::resolver::EntitlementResolver;

#[derive(Default)]
struct Tables {
    organizations: HashSet<OrganizationId>,
    members: HashMap<UserId, OrganizationId>,
    subscriptions: HashMap<OrganizationId, Subscription>,
    usage: HashMap<(OrganizationId, LimitDimension), u64>,
}

#[derive(Default)]
pub(crate) struct FixtureDirectory {
    tables: Mutex<Tables>,
}

impl TenantDirectory for FixtureDirectory {
    fn organization_exists(&self, organization: OrganizationId) -> Result<bool, DirectoryError> {
        Ok(self.tables.lock().organizations.contains(&organization))
    }

    fn organization_of_user(&self, user: UserId) -> Result<Option<OrganizationId>, DirectoryError> {
        Ok(self.tables.lock().members.get(&user).copied())
    }

    fn current_subscription(
        &self,
        organization: OrganizationId,
    ) -> Result<Option<Subscription>, DirectoryError> {
        Ok(self.tables.lock().subscriptions.get(&organization).cloned())
    }

    fn usage(
        &self,
        organization: OrganizationId,
        dimension: LimitDimension,
    ) -> Result<u64, DirectoryError> {
        Ok(self
            .tables
            .lock()
            .usage
            .get(&(organization, dimension))
            .copied()
            .unwrap_or(0))
    }
}

pub(crate) struct Fixture {
    pub catalog: PlanCatalog,
    pub directory: FixtureDirectory,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_catalog(PlanCatalog::defaults())
    }

    pub fn with_catalog(catalog: PlanCatalog) -> Self {
        Self {
            catalog,
            directory: FixtureDirectory::default(),
        }
    }

    pub fn resolver(&self) -> EntitlementResolver<'_, FixtureDirectory> {
        EntitlementResolver::new(&self.directory, &self.catalog)
    }

    pub fn add_org(&self) -> OrganizationId {
        let org = OrganizationId::new();
        self.directory.tables.lock().organizations.insert(org);
        org
    }

    pub fn add_member(&self, org: OrganizationId) -> UserId {
        let user = UserId::new();
        self.directory.tables.lock().members.insert(user, org);
        user
    }

    pub fn set_usage(&self, org: OrganizationId, dimension: LimitDimension, value: u64) {
        self.directory
            .tables
            .lock()
            .usage
            .insert((org, dimension), value);
    }

    pub fn subscribe(
        &self,
        org: OrganizationId,
        tier: PlanTier,
        status: SubscriptionStatus,
    ) -> SubscriptionId {
        let plan = self.catalog.by_tier(tier).expect("tier in catalog").id;
        self.subscribe_to_plan_id(org, plan, status)
    }

    pub fn subscribe_to_plan_id(
        &self,
        org: OrganizationId,
        plan: PlanId,
        status: SubscriptionStatus,
    ) -> SubscriptionId {
        let mut sub = Subscription::start(org, plan, SubscriptionStatus::Active, Timestamp::now(), None)
            .expect("valid subscription");
        sub.status = status;
        let id = sub.id;
        self.directory.tables.lock().subscriptions.insert(org, sub);
        id
    }

    pub fn subscribe_lapsed(&self, org: OrganizationId, tier: PlanTier) -> SubscriptionId {
        let plan = self.catalog.by_tier(tier).expect("tier in catalog").id;
        let start = Timestamp::parse("2020-01-01T00:00:00Z").expect("timestamp");
        let end = Timestamp::parse("2020-02-01T00:00:00Z").expect("timestamp");
        let sub = Subscription::start(org, plan, SubscriptionStatus::Active, start, Some(end))
            .expect("valid subscription");
        let id = sub.id;
        self.directory.tables.lock().subscriptions.insert(org, sub);
        id
    }
}
