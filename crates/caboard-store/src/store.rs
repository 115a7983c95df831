//! # Write-through Store
//!
//! [`Store`] pairs the in-memory [`Ledger`] with a durable backend. Every
//! mutation is applied to the ledger first (under its write lock), then
//! the resulting [`ChangeSet`] is handed to the backend. When the backend
//! fails, the change set is reverted so memory never runs ahead of what
//! was stored.
//!
//! Mutations are serialized by an async ordering lock held from the
//! ledger write until the backend answers. Change sets therefore reach
//! the backend in the order they were applied in memory, and a revert
//! never lands on top of a later write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;
use tokio::sync::Mutex;

use caboard_core::{
    Cents, DayValueId, EmployeeId, FileId, MandateId, OrganizationId, PlanId, PlanTier,
    SubscriptionId, Timestamp, UserId,
};
use caboard_entitlements::{Plan, PlanCatalog};
use caboard_payroll::{Employee, ManualPayrollEntry, PayrollImport};
use caboard_state::{Subscription, SubscriptionStatus, SubscriptionTransitionEvidence};

use crate::change::ChangeSet;
use crate::db;
use crate::error::StoreError;
use crate::ledger::Ledger;
use crate::records::{DayValue, Mandate, MemberRole, Organization, OrganizationUser, StoredFile};
use crate::revenue::AggregateDrift;
use crate::snapshot::Snapshot;
use crate::subscriptions::SubscriptionAction;

/// Where committed change sets go.
#[derive(Debug, Clone)]
enum Backend {
    /// Nothing durable; state lives as long as the process.
    Memory,
    /// Postgres, one transaction per change set.
    Postgres(PgPool),
    /// A JSON snapshot rewritten after every change set.
    SnapshotFile(PathBuf),
}

/// The ledger plus its durable backend.
#[derive(Debug, Clone)]
pub struct Store {
    ledger: Ledger,
    backend: Backend,
    /// Held across one mutation and its persistence.
    order: Arc<Mutex<()>>,
}

impl Store {
    /// In-memory store over `catalog`.
    pub fn in_memory(catalog: PlanCatalog) -> Self {
        Self {
            ledger: Ledger::new(catalog),
            backend: Backend::Memory,
            order: Arc::default(),
        }
    }

    /// Hydrate from Postgres.
    ///
    /// When the database holds no plans yet, `fallback_catalog` is seeded
    /// into it so the FREE plan always exists.
    pub async fn open(pool: PgPool, fallback_catalog: PlanCatalog) -> Result<Self, StoreError> {
        let snapshot = db::load_snapshot(&pool).await?;
        let empty_catalog = snapshot.plans.is_empty();
        tracing::info!(
            organizations = snapshot.organizations.len(),
            mandates = snapshot.mandates.len(),
            day_values = snapshot.day_values.len(),
            "hydrated ledger from database"
        );
        let store = Self {
            ledger: Ledger::from_snapshot(snapshot)?,
            backend: Backend::Postgres(pool),
            order: Arc::default(),
        };
        if empty_catalog {
            tracing::warn!("database has no plans, seeding the configured catalog");
            store.seed_plans(fallback_catalog.plans().to_vec()).await?;
        }
        Ok(store)
    }

    /// Load a snapshot file and write every change back to it.
    ///
    /// A missing file starts an empty ledger over `fallback_catalog`.
    pub fn open_snapshot(path: &Path, fallback_catalog: PlanCatalog) -> Result<Self, StoreError> {
        let ledger = if path.exists() {
            let mut snapshot = Snapshot::load(path)?;
            if snapshot.plans.is_empty() {
                snapshot.plans = fallback_catalog.plans().to_vec();
            }
            Ledger::from_snapshot(snapshot)?
        } else {
            tracing::info!(path = %path.display(), "snapshot file absent, starting empty");
            Ledger::new(fallback_catalog)
        };
        Ok(Self {
            ledger,
            backend: Backend::SnapshotFile(path.to_path_buf()),
            order: Arc::default(),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The Postgres pool, when the store is database-backed.
    pub fn pool(&self) -> Option<&PgPool> {
        match &self.backend {
            Backend::Postgres(pool) => Some(pool),
            _ => None,
        }
    }

    /// Whether mutations survive a restart.
    pub fn is_durable(&self) -> bool {
        !matches!(self.backend, Backend::Memory)
    }

    /// Apply `mutation` to the ledger and persist its change set,
    /// reverting it in memory on failure.
    async fn commit<T>(
        &self,
        mutation: impl FnOnce(&Ledger) -> Result<(T, ChangeSet), StoreError>,
    ) -> Result<T, StoreError> {
        let _order = self.order.lock().await;
        let (value, changes) = mutation(&self.ledger)?;
        if changes.is_empty() {
            return Ok(value);
        }
        let outcome = match &self.backend {
            Backend::Memory => Ok(()),
            Backend::Postgres(pool) => db::persist(pool, &changes)
                .await
                .map_err(|e| StoreError::Persistence(e.to_string())),
            Backend::SnapshotFile(path) => save_snapshot(self.ledger.snapshot(), path.clone()).await,
        };
        match outcome {
            Ok(()) => Ok(value),
            Err(e) => {
                tracing::error!(error = %e, changes = changes.applied().len(), "write-through failed, reverting");
                self.ledger.revert(changes);
                Err(e)
            }
        }
    }

    // -- Plans --------------------------------------------------------

    pub async fn seed_plans(&self, plans: Vec<Plan>) -> Result<Vec<Plan>, StoreError> {
        self.commit(|ledger| ledger.seed_plans(plans)).await
    }

    // -- Tenants ------------------------------------------------------

    pub async fn create_organization(&self, name: &str) -> Result<Organization, StoreError> {
        self.commit(|ledger| ledger.create_organization(name)).await
    }

    /// Create an organization and make `owner` its first member.
    pub async fn create_organization_with_owner(
        &self,
        name: &str,
        owner: UserId,
    ) -> Result<OrganizationUser, StoreError> {
        self.commit(|ledger| ledger.create_organization_with_owner(name, owner))
            .await
    }

    pub async fn add_member(
        &self,
        org: OrganizationId,
        user: UserId,
        role: MemberRole,
    ) -> Result<OrganizationUser, StoreError> {
        self.commit(|ledger| ledger.add_member(org, user, role)).await
    }

    /// Add a member only if the plan has a free seat, decided in the same
    /// write section as the insert.
    pub async fn add_member_within_limits(
        &self,
        org: OrganizationId,
        user: UserId,
        role: MemberRole,
    ) -> Result<OrganizationUser, StoreError> {
        self.commit(|ledger| ledger.add_member_within_limits(org, user, role)).await
    }

    pub async fn remove_member(&self, user: UserId) -> Result<OrganizationUser, StoreError> {
        self.commit(|ledger| ledger.remove_member(user)).await
    }

    pub async fn create_mandate(&self, org: OrganizationId, name: &str) -> Result<Mandate, StoreError> {
        self.commit(|ledger| ledger.create_mandate(org, name)).await
    }

    pub async fn create_mandate_within_limits(
        &self,
        org: OrganizationId,
        name: &str,
    ) -> Result<Mandate, StoreError> {
        self.commit(|ledger| ledger.create_mandate_within_limits(org, name)).await
    }

    pub async fn add_file(
        &self,
        org: OrganizationId,
        name: &str,
        size_bytes: u64,
    ) -> Result<StoredFile, StoreError> {
        self.commit(|ledger| ledger.add_file(org, name, size_bytes)).await
    }

    pub async fn add_file_within_limits(
        &self,
        org: OrganizationId,
        name: &str,
        size_bytes: u64,
    ) -> Result<StoredFile, StoreError> {
        self.commit(|ledger| ledger.add_file_within_limits(org, name, size_bytes))
            .await
    }

    pub async fn remove_file(&self, id: FileId) -> Result<StoredFile, StoreError> {
        self.commit(|ledger| ledger.remove_file(id)).await
    }

    // -- Revenue ------------------------------------------------------

    pub async fn record_day_value(
        &self,
        mandate: MandateId,
        date: NaiveDate,
        value: Cents,
    ) -> Result<DayValue, StoreError> {
        self.commit(|ledger| ledger.record_day_value(mandate, date, value)).await
    }

    pub async fn update_day_value(&self, id: DayValueId, value: Cents) -> Result<DayValue, StoreError> {
        self.commit(|ledger| ledger.update_day_value(id, value)).await
    }

    pub async fn delete_day_value(&self, id: DayValueId) -> Result<DayValue, StoreError> {
        self.commit(|ledger| ledger.delete_day_value(id)).await
    }

    pub async fn recompute_aggregates(&self, mandate: MandateId) -> Result<Mandate, StoreError> {
        self.commit(|ledger| ledger.recompute_aggregates(mandate)).await
    }

    /// Recompute every drifted mandate and return what was fixed.
    pub async fn repair_aggregates(&self) -> Result<Vec<AggregateDrift>, StoreError> {
        self.commit(|ledger| ledger.repair_aggregates()).await
    }

    // -- Payroll ------------------------------------------------------

    pub async fn record_manual_payroll(
        &self,
        entry: ManualPayrollEntry,
    ) -> Result<ManualPayrollEntry, StoreError> {
        self.commit(|ledger| ledger.record_manual_payroll(entry)).await
    }

    pub async fn record_payroll_import(&self, import: PayrollImport) -> Result<PayrollImport, StoreError> {
        self.commit(|ledger| ledger.record_payroll_import(import)).await
    }

    pub async fn add_employee(
        &self,
        mandate: MandateId,
        name: &str,
        active: bool,
    ) -> Result<Employee, StoreError> {
        self.commit(|ledger| ledger.add_employee(mandate, name, active)).await
    }

    pub async fn set_employee_active(&self, id: EmployeeId, active: bool) -> Result<Employee, StoreError> {
        self.commit(|ledger| ledger.set_employee_active(id, active)).await
    }

    // -- Subscriptions ------------------------------------------------

    pub async fn subscribe(
        &self,
        org: OrganizationId,
        plan: PlanId,
        initial: SubscriptionStatus,
        period_start: Timestamp,
        period_end: Option<Timestamp>,
    ) -> Result<Subscription, StoreError> {
        self.commit(|ledger| ledger.subscribe(org, plan, initial, period_start, period_end))
            .await
    }

    pub async fn change_plan(
        &self,
        org: OrganizationId,
        tier: PlanTier,
        period_start: Timestamp,
        period_end: Option<Timestamp>,
        actor: Option<String>,
    ) -> Result<Subscription, StoreError> {
        self.commit(|ledger| ledger.change_plan(org, tier, period_start, period_end, actor))
            .await
    }

    pub async fn transition_subscription(
        &self,
        org: OrganizationId,
        action: SubscriptionAction,
        evidence: SubscriptionTransitionEvidence,
    ) -> Result<Subscription, StoreError> {
        self.commit(|ledger| ledger.transition_subscription(org, action, evidence))
            .await
    }

    pub async fn expire_lapsed(&self, now: Timestamp) -> Result<Vec<SubscriptionId>, StoreError> {
        self.commit(|ledger| ledger.expire_lapsed(now)).await
    }
}

/// Write the snapshot off the async worker threads.
async fn save_snapshot(snapshot: Snapshot, path: PathBuf) -> Result<(), StoreError> {
    tokio::task::spawn_blocking(move || snapshot.save(&path))
        .await
        .map_err(|e| StoreError::Snapshot(format!("snapshot writer stopped: {e}")))?
}
