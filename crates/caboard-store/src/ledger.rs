//! # Tenant Ledger
//!
//! In-memory tables for every tenant row, behind a single
//! `parking_lot::RwLock`. Reads take the read lock; every mutation runs
//! inside [`Ledger::write`], which holds the write lock for the whole
//! multi-row change and rolls the change back if the closure fails.
//!
//! The lock is never held across an `.await`: persistence happens in
//! [`crate::Store`] after the write section returns its [`ChangeSet`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;

use caboard_core::{
    Cents, DayValueId, EmployeeId, FileId, LimitDimension, MandateId, OrganizationId,
    SubscriptionId, Timestamp, UserId, YearMonth,
};
use caboard_entitlements::{DirectoryError, PlanCatalog, TenantDirectory};
use caboard_payroll::{Employee, ManualPayrollEntry, PayrollError, PayrollImport, PayrollSource};
use caboard_state::{Subscription, SubscriptionStatus};

use crate::change::{Change, ChangeSet, Row, RowKey};
use crate::error::StoreError;
use crate::records::{DayValue, Mandate, Organization, OrganizationUser, StoredFile};

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) catalog: PlanCatalog,
    pub(crate) organizations: HashMap<OrganizationId, Organization>,
    pub(crate) members: HashMap<UserId, OrganizationUser>,
    pub(crate) subscriptions: HashMap<SubscriptionId, Subscription>,
    pub(crate) mandates: HashMap<MandateId, Mandate>,
    pub(crate) day_values: HashMap<DayValueId, DayValue>,
    /// Unique (mandate, date) index over `day_values`.
    pub(crate) day_index: BTreeMap<(MandateId, NaiveDate), DayValueId>,
    pub(crate) files: HashMap<FileId, StoredFile>,
    pub(crate) manual_payroll: HashMap<(MandateId, YearMonth), ManualPayrollEntry>,
    pub(crate) payroll_imports: HashMap<(MandateId, Timestamp), PayrollImport>,
    pub(crate) employees: HashMap<EmployeeId, Employee>,
}

impl Tables {
    /// Apply a change and return its inverse.
    fn apply(&mut self, change: Change) -> Change {
        match change {
            Change::Put(row) => {
                let key = row.key();
                self.put(row).map_or(Change::Delete(key), Change::Put)
            }
            Change::Delete(key) => self.delete(key).map_or(Change::Delete(key), Change::Put),
        }
    }

    fn put(&mut self, row: Row) -> Option<Row> {
        match row {
            Row::Plan(p) => {
                let previous = self.catalog.by_id(p.id).cloned();
                self.catalog.upsert(p);
                previous.map(Row::Plan)
            }
            Row::Organization(o) => self.organizations.insert(o.id, o).map(Row::Organization),
            Row::Member(m) => self.members.insert(m.user_id, m).map(Row::Member),
            Row::Subscription(s) => self.subscriptions.insert(s.id, s).map(Row::Subscription),
            Row::Mandate(m) => self.mandates.insert(m.id, m).map(Row::Mandate),
            Row::DayValue(d) => {
                let previous = self.day_values.insert(d.id, d.clone());
                if let Some(old) = &previous {
                    self.day_index.remove(&(old.mandate_id, old.date));
                }
                self.day_index.insert((d.mandate_id, d.date), d.id);
                previous.map(Row::DayValue)
            }
            Row::File(f) => self.files.insert(f.id, f).map(Row::File),
            Row::ManualPayroll(e) => self
                .manual_payroll
                .insert((e.mandate_id, e.period), e)
                .map(Row::ManualPayroll),
            Row::PayrollImport(i) => self
                .payroll_imports
                .insert((i.mandate_id, i.import_date), i)
                .map(Row::PayrollImport),
            Row::Employee(e) => self.employees.insert(e.id, e).map(Row::Employee),
        }
    }

    fn delete(&mut self, key: RowKey) -> Option<Row> {
        match key {
            RowKey::Plan(id) => self.catalog.remove(id).map(Row::Plan),
            RowKey::Organization(id) => self.organizations.remove(&id).map(Row::Organization),
            RowKey::Member(id) => self.members.remove(&id).map(Row::Member),
            RowKey::Subscription(id) => self.subscriptions.remove(&id).map(Row::Subscription),
            RowKey::Mandate(id) => self.mandates.remove(&id).map(Row::Mandate),
            RowKey::DayValue(id) => {
                let old = self.day_values.remove(&id)?;
                self.day_index.remove(&(old.mandate_id, old.date));
                Some(Row::DayValue(old))
            }
            RowKey::File(id) => self.files.remove(&id).map(Row::File),
            RowKey::ManualPayroll(m, p) => self.manual_payroll.remove(&(m, p)).map(Row::ManualPayroll),
            RowKey::PayrollImport(m, t) => self
                .payroll_imports
                .remove(&(m, t))
                .map(Row::PayrollImport),
            RowKey::Employee(id) => self.employees.remove(&id).map(Row::Employee),
        }
    }

    /// Undo `changes`, then re-derive the aggregates of every mandate they
    /// touched. A write committed after `changes` may have moved the same
    /// mandate, so its undo image is not trusted for the cached fields.
    fn revert(&mut self, changes: ChangeSet) {
        let touched: BTreeSet<MandateId> = changes
            .applied
            .iter()
            .chain(&changes.undo)
            .filter_map(|change| match change {
                Change::Put(Row::Mandate(m)) => Some(m.id),
                Change::Put(Row::DayValue(d)) => Some(d.mandate_id),
                _ => None,
            })
            .collect();
        for change in changes.undo.into_iter().rev() {
            self.apply(change);
        }
        for mandate in touched {
            self.resync_aggregates(mandate);
        }
    }

    pub(crate) fn organization(&self, id: OrganizationId) -> Result<&Organization, StoreError> {
        self.organizations
            .get(&id)
            .ok_or_else(|| StoreError::not_found("organization", id))
    }

    pub(crate) fn mandate(&self, id: MandateId) -> Result<&Mandate, StoreError> {
        self.mandates
            .get(&id)
            .ok_or_else(|| StoreError::not_found("mandate", id))
    }

    /// Day values of `mandate`, ordered by date.
    pub(crate) fn day_values_of(&self, mandate: MandateId) -> impl Iterator<Item = &DayValue> {
        self.day_index
            .range((mandate, NaiveDate::MIN)..=(mandate, NaiveDate::MAX))
            .filter_map(|(_, id)| self.day_values.get(id))
    }

    /// The organization's live subscription, or else its latest canceled one.
    ///
    /// At most one subscription per organization is non-terminal.
    pub(crate) fn current_subscription(&self, org: OrganizationId) -> Option<&Subscription> {
        let owned = || {
            self.subscriptions
                .values()
                .filter(move |s| s.organization_id == org)
        };
        owned().find(|s| !s.is_terminal()).or_else(|| {
            owned()
                .filter(|s| s.status == SubscriptionStatus::Canceled)
                .max_by_key(|s| (s.created_at, s.current_period_start))
        })
    }

    pub(crate) fn usage(&self, org: OrganizationId, dimension: LimitDimension) -> u64 {
        match dimension {
            LimitDimension::Users => count(self.members.values().filter(|m| m.organization_id == org)),
            LimitDimension::Mandates => {
                count(self.mandates.values().filter(|m| m.organization_id == org))
            }
            LimitDimension::Storage => self
                .files
                .values()
                .filter(|f| f.organization_id == org)
                .fold(0u64, |acc, f| acc.saturating_add(f.size_bytes)),
            LimitDimension::Objects
            | LimitDimension::Sectors
            | LimitDimension::Articles
            | LimitDimension::Tasks => 0,
        }
    }
}

fn count<I: Iterator>(iter: I) -> u64 {
    iter.count() as u64
}

/// Stages changes against the tables during a write section.
pub(crate) struct Writer<'a> {
    tables: &'a mut Tables,
    changes: ChangeSet,
}

impl Writer<'_> {
    pub(crate) fn tables(&self) -> &Tables {
        self.tables
    }

    pub(crate) fn put(&mut self, row: Row) {
        let inverse = self.tables.apply(Change::Put(row.clone()));
        self.changes.applied.push(Change::Put(row));
        self.changes.undo.push(inverse);
    }

    pub(crate) fn delete(&mut self, key: RowKey) {
        let inverse = self.tables.apply(Change::Delete(key));
        self.changes.applied.push(Change::Delete(key));
        self.changes.undo.push(inverse);
    }
}

/// Shared handle to the in-memory tenant tables.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    tables: Arc<RwLock<Tables>>,
}

impl Ledger {
    /// Empty ledger over `catalog`.
    pub fn new(catalog: PlanCatalog) -> Self {
        Self::from_tables(Tables {
            catalog,
            ..Tables::default()
        })
    }

    pub(crate) fn from_tables(tables: Tables) -> Self {
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self.tables.read())
    }

    /// Run a mutation under the write lock. On error every change the
    /// closure staged is undone before the lock is released.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&mut Writer<'_>) -> Result<R, StoreError>,
    ) -> Result<(R, ChangeSet), StoreError> {
        let mut guard = self.tables.write();
        let mut writer = Writer {
            tables: &mut *guard,
            changes: ChangeSet::default(),
        };
        match f(&mut writer) {
            Ok(value) => Ok((value, writer.changes)),
            Err(e) => {
                let staged = std::mem::take(&mut writer.changes);
                writer.tables.revert(staged);
                Err(e)
            }
        }
    }

    /// Undo a committed change set (used when persistence fails).
    pub fn revert(&self, changes: ChangeSet) {
        self.tables.write().revert(changes);
    }

    /// Copy of the plan catalog.
    pub fn catalog(&self) -> PlanCatalog {
        self.read(|t| t.catalog.clone())
    }

    pub fn organization(&self, id: OrganizationId) -> Result<Organization, StoreError> {
        self.read(|t| t.organization(id).cloned())
    }

    /// Every organization, oldest first.
    pub fn organizations(&self) -> Vec<Organization> {
        let mut orgs: Vec<_> = self.read(|t| t.organizations.values().cloned().collect());
        orgs.sort_by_key(|o| (o.created_at, o.id));
        orgs
    }

    pub fn members(&self, org: OrganizationId) -> Vec<OrganizationUser> {
        let mut members: Vec<_> = self.read(|t| {
            t.members
                .values()
                .filter(|m| m.organization_id == org)
                .cloned()
                .collect()
        });
        members.sort_by_key(|m| (m.joined_at, m.user_id));
        members
    }

    pub fn mandate(&self, id: MandateId) -> Result<Mandate, StoreError> {
        self.read(|t| t.mandate(id).cloned())
    }

    pub fn mandates(&self, org: OrganizationId) -> Vec<Mandate> {
        let mut mandates: Vec<_> = self.read(|t| {
            t.mandates
                .values()
                .filter(|m| m.organization_id == org)
                .cloned()
                .collect()
        });
        mandates.sort_by_key(|m| (m.created_at, m.id));
        mandates
    }

    /// Day values of a mandate, ordered by date.
    pub fn day_values(&self, mandate: MandateId) -> Result<Vec<DayValue>, StoreError> {
        self.read(|t| {
            t.mandate(mandate)?;
            Ok(t.day_values_of(mandate).cloned().collect())
        })
    }

    pub fn files(&self, org: OrganizationId) -> Vec<StoredFile> {
        let mut files: Vec<_> = self.read(|t| {
            t.files
                .values()
                .filter(|f| f.organization_id == org)
                .cloned()
                .collect()
        });
        files.sort_by_key(|f| (f.uploaded_at, f.id));
        files
    }

    /// All subscriptions of an organization, oldest first.
    pub fn subscriptions(&self, org: OrganizationId) -> Vec<Subscription> {
        let mut subs: Vec<_> = self.read(|t| {
            t.subscriptions
                .values()
                .filter(|s| s.organization_id == org)
                .cloned()
                .collect()
        });
        subs.sort_by_key(|s| (s.created_at, s.id));
        subs
    }

    pub fn employees(&self, mandate: MandateId) -> Vec<Employee> {
        let mut employees: Vec<_> = self.read(|t| {
            t.employees
                .values()
                .filter(|e| e.mandate_id == mandate)
                .cloned()
                .collect()
        });
        employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        employees
    }
}

/// Read under a lock the caller already holds, so limit checks can run
/// inside a write section.
impl TenantDirectory for Tables {
    fn organization_exists(&self, organization: OrganizationId) -> Result<bool, DirectoryError> {
        Ok(self.organizations.contains_key(&organization))
    }

    fn organization_of_user(&self, user: UserId) -> Result<Option<OrganizationId>, DirectoryError> {
        Ok(self.members.get(&user).map(|m| m.organization_id))
    }

    fn current_subscription(
        &self,
        organization: OrganizationId,
    ) -> Result<Option<Subscription>, DirectoryError> {
        Ok(Tables::current_subscription(self, organization).cloned())
    }

    fn usage(
        &self,
        organization: OrganizationId,
        dimension: LimitDimension,
    ) -> Result<u64, DirectoryError> {
        Ok(Tables::usage(self, organization, dimension))
    }
}

impl TenantDirectory for Ledger {
    fn organization_exists(&self, organization: OrganizationId) -> Result<bool, DirectoryError> {
        self.read(|t| t.organization_exists(organization))
    }

    fn organization_of_user(&self, user: UserId) -> Result<Option<OrganizationId>, DirectoryError> {
        self.read(|t| t.organization_of_user(user))
    }

    fn current_subscription(
        &self,
        organization: OrganizationId,
    ) -> Result<Option<Subscription>, DirectoryError> {
        self.read(|t| TenantDirectory::current_subscription(t, organization))
    }

    fn usage(
        &self,
        organization: OrganizationId,
        dimension: LimitDimension,
    ) -> Result<u64, DirectoryError> {
        self.read(|t| TenantDirectory::usage(t, organization, dimension))
    }
}

impl PayrollSource for Ledger {
    fn mandate_exists(&self, mandate: MandateId) -> Result<bool, PayrollError> {
        Ok(self.read(|t| t.mandates.contains_key(&mandate)))
    }

    fn manual_entries(&self, mandate: MandateId) -> Result<Vec<ManualPayrollEntry>, PayrollError> {
        Ok(self.read(|t| {
            t.manual_payroll
                .values()
                .filter(|e| e.mandate_id == mandate)
                .cloned()
                .collect()
        }))
    }

    fn imports(&self, mandate: MandateId) -> Result<Vec<PayrollImport>, PayrollError> {
        Ok(self.read(|t| {
            t.payroll_imports
                .values()
                .filter(|i| i.mandate_id == mandate)
                .cloned()
                .collect()
        }))
    }

    fn active_employee_count(&self, mandate: MandateId) -> Result<u64, PayrollError> {
        Ok(self.read(|t| {
            count(
                t.employees
                    .values()
                    .filter(|e| e.mandate_id == mandate && e.active),
            )
        }))
    }

    fn revenue_in_month(
        &self,
        mandate: MandateId,
        period: YearMonth,
    ) -> Result<Cents, PayrollError> {
        Ok(self.read(|t| {
            t.day_index
                .range((mandate, period.first_day())..=(mandate, period.last_day()))
                .filter_map(|(_, id)| t.day_values.get(id))
                .map(|d| d.value)
                .sum()
        }))
    }
}
