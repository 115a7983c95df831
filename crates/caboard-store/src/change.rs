//! Row-level change sets.
//!
//! Every ledger mutation is expressed as a list of [`Change`]s applied under
//! one write lock. Applying a change yields its inverse, so a mutation
//! carries both what to persist and how to undo itself in memory if the
//! database refuses it.

use caboard_core::{
    DayValueId, EmployeeId, FileId, MandateId, OrganizationId, PlanId, SubscriptionId,
    Timestamp, UserId, YearMonth,
};
use caboard_entitlements::Plan;
use caboard_payroll::{Employee, ManualPayrollEntry, PayrollImport};
use caboard_state::Subscription;

use crate::records::{DayValue, Mandate, Organization, OrganizationUser, StoredFile};

/// A full row of any ledger table.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Plan(Plan),
    Organization(Organization),
    Member(OrganizationUser),
    Subscription(Subscription),
    Mandate(Mandate),
    DayValue(DayValue),
    File(StoredFile),
    ManualPayroll(ManualPayrollEntry),
    PayrollImport(PayrollImport),
    Employee(Employee),
}

/// Primary key of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    Plan(PlanId),
    Organization(OrganizationId),
    Member(UserId),
    Subscription(SubscriptionId),
    Mandate(MandateId),
    DayValue(DayValueId),
    File(FileId),
    ManualPayroll(MandateId, YearMonth),
    PayrollImport(MandateId, Timestamp),
    Employee(EmployeeId),
}

impl Row {
    pub fn key(&self) -> RowKey {
        match self {
            Row::Plan(p) => RowKey::Plan(p.id),
            Row::Organization(o) => RowKey::Organization(o.id),
            Row::Member(m) => RowKey::Member(m.user_id),
            Row::Subscription(s) => RowKey::Subscription(s.id),
            Row::Mandate(m) => RowKey::Mandate(m.id),
            Row::DayValue(d) => RowKey::DayValue(d.id),
            Row::File(f) => RowKey::File(f.id),
            Row::ManualPayroll(e) => RowKey::ManualPayroll(e.mandate_id, e.period),
            Row::PayrollImport(i) => RowKey::PayrollImport(i.mandate_id, i.import_date),
            Row::Employee(e) => RowKey::Employee(e.id),
        }
    }
}

/// Insert-or-replace a row, or delete one by key.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Put(Row),
    Delete(RowKey),
}

/// Changes applied by one mutation, each paired with its inverse.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub(crate) applied: Vec<Change>,
    pub(crate) undo: Vec<Change>,
}

impl ChangeSet {
    /// Changes in application order.
    pub fn applied(&self) -> &[Change] {
        &self.applied
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}
