//! JSON snapshot of the whole ledger.
//!
//! Used by the CLI when no database is configured, and as the shape the
//! database loader produces on startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use caboard_entitlements::{Plan, PlanCatalog};
use caboard_payroll::{Employee, ManualPayrollEntry, PayrollImport};
use caboard_state::Subscription;

use crate::error::StoreError;
use crate::ledger::{Ledger, Tables};
use crate::records::{DayValue, Mandate, Organization, OrganizationUser, StoredFile};

/// Every row of the ledger, table by table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub members: Vec<OrganizationUser>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub mandates: Vec<Mandate>,
    #[serde(default)]
    pub day_values: Vec<DayValue>,
    #[serde(default)]
    pub files: Vec<StoredFile>,
    #[serde(default)]
    pub manual_payroll: Vec<ManualPayrollEntry>,
    #[serde(default)]
    pub payroll_imports: Vec<PayrollImport>,
    #[serde(default)]
    pub employees: Vec<Employee>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Snapshot(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| StoreError::Snapshot(format!("parsing {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::Snapshot(format!("encoding snapshot: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| StoreError::Snapshot(format!("writing {}: {e}", path.display())))
    }
}

fn sorted<T: Clone, K: Ord>(rows: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(key);
    rows
}

impl Ledger {
    /// Build a ledger from a snapshot.
    ///
    /// Rejects duplicate plans and duplicate (mandate, date) day values.
    /// Cached aggregates are loaded as stored; see
    /// [`Ledger::verify_aggregates`].
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let catalog =
            PlanCatalog::new(snapshot.plans).map_err(|e| StoreError::Configuration(e.to_string()))?;
        let mut tables = Tables {
            catalog,
            ..Tables::default()
        };
        tables.organizations = snapshot.organizations.into_iter().map(|o| (o.id, o)).collect();
        tables.members = snapshot.members.into_iter().map(|m| (m.user_id, m)).collect();
        tables.subscriptions = snapshot.subscriptions.into_iter().map(|s| (s.id, s)).collect();
        tables.mandates = snapshot.mandates.into_iter().map(|m| (m.id, m)).collect();
        for d in snapshot.day_values {
            if tables.day_index.insert((d.mandate_id, d.date), d.id).is_some() {
                return Err(StoreError::Conflict(format!(
                    "snapshot has two values for mandate {} on {}",
                    d.mandate_id, d.date
                )));
            }
            tables.day_values.insert(d.id, d);
        }
        tables.files = snapshot.files.into_iter().map(|f| (f.id, f)).collect();
        tables.manual_payroll = snapshot
            .manual_payroll
            .into_iter()
            .map(|e| ((e.mandate_id, e.period), e))
            .collect();
        tables.payroll_imports = snapshot
            .payroll_imports
            .into_iter()
            .map(|i| ((i.mandate_id, i.import_date), i))
            .collect();
        tables.employees = snapshot.employees.into_iter().map(|e| (e.id, e)).collect();
        Ok(Self::from_tables(tables))
    }

    /// Copy every row out, in a stable order.
    pub fn snapshot(&self) -> Snapshot {
        self.read(|t| Snapshot {
            plans: t.catalog.plans().to_vec(),
            organizations: sorted(t.organizations.values().cloned(), |o| (o.created_at, o.id)),
            members: sorted(t.members.values().cloned(), |m| (m.joined_at, m.user_id)),
            subscriptions: sorted(t.subscriptions.values().cloned(), |s| (s.created_at, s.id)),
            mandates: sorted(t.mandates.values().cloned(), |m| (m.created_at, m.id)),
            day_values: t
                .day_index
                .values()
                .filter_map(|id| t.day_values.get(id).cloned())
                .collect(),
            files: sorted(t.files.values().cloned(), |f| (f.uploaded_at, f.id)),
            manual_payroll: sorted(t.manual_payroll.values().cloned(), |e| {
                (e.mandate_id, e.period)
            }),
            payroll_imports: sorted(t.payroll_imports.values().cloned(), |i| {
                (i.mandate_id, i.import_date)
            }),
            employees: sorted(t.employees.values().cloned(), |e| e.id),
        })
    }
}
