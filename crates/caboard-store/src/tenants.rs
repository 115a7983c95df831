//! Organization, membership, mandate, file and payroll mutations.
//!
//! The plain creations do not consult plan limits; seeding, imports and
//! maintenance use them. The `*_within_limits` variants evaluate
//! `can_perform_action` inside the same write section as the insert, so
//! two concurrent creations cannot both take the last unit of room.

use caboard_core::{
    Cents, EmployeeId, FileId, LimitDimension, MandateId, OrganizationId, Timestamp, UserId,
    ValidationError,
};
use caboard_entitlements::EntitlementResolver;
use caboard_payroll::{Employee, ManualPayrollEntry, PayrollImport};

use crate::change::{ChangeSet, Row, RowKey};
use crate::error::StoreError;
use crate::ledger::{Ledger, Writer};
use crate::records::{Mandate, MemberRole, Organization, OrganizationUser, StoredFile};

fn require_name(kind: &str, name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Invalid(format!("{kind} name must not be empty")).into());
    }
    Ok(trimmed.to_string())
}

impl Writer<'_> {
    /// Refuse the write unless `increment` more units of `dimension` fit
    /// under the organization's effective plan, as the tables stand now.
    fn require_capacity(
        &self,
        org: OrganizationId,
        dimension: LimitDimension,
        increment: u64,
    ) -> Result<(), StoreError> {
        let tables = self.tables();
        let check = EntitlementResolver::new(tables, &tables.catalog)
            .can_perform_action(org, dimension, increment)?;
        if check.allowed {
            Ok(())
        } else {
            Err(StoreError::LimitExceeded(check))
        }
    }

    fn insert_member(
        &mut self,
        org: OrganizationId,
        user: UserId,
        role: MemberRole,
    ) -> Result<OrganizationUser, StoreError> {
        self.tables().organization(org)?;
        if let Some(existing) = self.tables().members.get(&user) {
            return Err(StoreError::Conflict(format!(
                "user {user} already belongs to {}",
                existing.organization_id
            )));
        }
        let member = OrganizationUser {
            user_id: user,
            organization_id: org,
            role,
            joined_at: Timestamp::now(),
        };
        self.put(Row::Member(member.clone()));
        Ok(member)
    }

    fn insert_mandate(&mut self, org: OrganizationId, name: String) -> Result<Mandate, StoreError> {
        self.tables().organization(org)?;
        let mandate = Mandate {
            id: MandateId::new(),
            organization_id: org,
            name,
            total_revenue: Cents::ZERO,
            last_entry: None,
            created_at: Timestamp::now(),
        };
        self.put(Row::Mandate(mandate.clone()));
        Ok(mandate)
    }

    fn insert_file(
        &mut self,
        org: OrganizationId,
        name: String,
        size_bytes: u64,
    ) -> Result<StoredFile, StoreError> {
        self.tables().organization(org)?;
        let file = StoredFile {
            id: FileId::new(),
            organization_id: org,
            name,
            size_bytes,
            uploaded_at: Timestamp::now(),
        };
        self.put(Row::File(file.clone()));
        Ok(file)
    }
}

impl Ledger {
    pub fn create_organization(&self, name: &str) -> Result<(Organization, ChangeSet), StoreError> {
        let name = require_name("organization", name)?;
        self.write(|w| {
            let org = Organization {
                id: OrganizationId::new(),
                name,
                created_at: Timestamp::now(),
            };
            w.put(Row::Organization(org.clone()));
            Ok(org)
        })
    }

    /// Create an organization with `owner` as its first member.
    pub fn create_organization_with_owner(
        &self,
        name: &str,
        owner: UserId,
    ) -> Result<(OrganizationUser, ChangeSet), StoreError> {
        let name = require_name("organization", name)?;
        self.write(|w| {
            if let Some(existing) = w.tables().members.get(&owner) {
                return Err(StoreError::Conflict(format!(
                    "user {owner} already belongs to {}",
                    existing.organization_id
                )));
            }
            let now = Timestamp::now();
            let org = Organization {
                id: OrganizationId::new(),
                name,
                created_at: now,
            };
            let member = OrganizationUser {
                user_id: owner,
                organization_id: org.id,
                role: MemberRole::Owner,
                joined_at: now,
            };
            w.put(Row::Organization(org));
            w.put(Row::Member(member.clone()));
            Ok(member)
        })
    }

    /// Attach a user to an organization. A user belongs to at most one.
    pub fn add_member(
        &self,
        org: OrganizationId,
        user: UserId,
        role: MemberRole,
    ) -> Result<(OrganizationUser, ChangeSet), StoreError> {
        self.write(|w| w.insert_member(org, user, role))
    }

    /// [`Ledger::add_member`], refused when the plan has no free seat.
    pub fn add_member_within_limits(
        &self,
        org: OrganizationId,
        user: UserId,
        role: MemberRole,
    ) -> Result<(OrganizationUser, ChangeSet), StoreError> {
        self.write(|w| {
            w.tables().organization(org)?;
            if !w.tables().members.contains_key(&user) {
                w.require_capacity(org, LimitDimension::Users, 1)?;
            }
            w.insert_member(org, user, role)
        })
    }

    pub fn remove_member(&self, user: UserId) -> Result<(OrganizationUser, ChangeSet), StoreError> {
        self.write(|w| {
            let member = w
                .tables()
                .members
                .get(&user)
                .cloned()
                .ok_or_else(|| StoreError::not_found("member", user))?;
            w.delete(RowKey::Member(user));
            Ok(member)
        })
    }

    pub fn create_mandate(
        &self,
        org: OrganizationId,
        name: &str,
    ) -> Result<(Mandate, ChangeSet), StoreError> {
        let name = require_name("mandate", name)?;
        self.write(|w| w.insert_mandate(org, name))
    }

    /// [`Ledger::create_mandate`], refused when the plan allows no more.
    pub fn create_mandate_within_limits(
        &self,
        org: OrganizationId,
        name: &str,
    ) -> Result<(Mandate, ChangeSet), StoreError> {
        let name = require_name("mandate", name)?;
        self.write(|w| {
            w.tables().organization(org)?;
            w.require_capacity(org, LimitDimension::Mandates, 1)?;
            w.insert_mandate(org, name)
        })
    }

    pub fn add_file(
        &self,
        org: OrganizationId,
        name: &str,
        size_bytes: u64,
    ) -> Result<(StoredFile, ChangeSet), StoreError> {
        let name = require_name("file", name)?;
        self.write(|w| w.insert_file(org, name, size_bytes))
    }

    /// [`Ledger::add_file`], refused when the bytes do not fit in the
    /// plan's storage. Empty files take no storage and are not checked.
    pub fn add_file_within_limits(
        &self,
        org: OrganizationId,
        name: &str,
        size_bytes: u64,
    ) -> Result<(StoredFile, ChangeSet), StoreError> {
        let name = require_name("file", name)?;
        self.write(|w| {
            w.tables().organization(org)?;
            if size_bytes > 0 {
                w.require_capacity(org, LimitDimension::Storage, size_bytes)?;
            }
            w.insert_file(org, name, size_bytes)
        })
    }

    pub fn remove_file(&self, id: FileId) -> Result<(StoredFile, ChangeSet), StoreError> {
        self.write(|w| {
            let file = w
                .tables()
                .files
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("file", id))?;
            w.delete(RowKey::File(id));
            Ok(file)
        })
    }

    /// Record or correct the manual payroll entry for a month.
    pub fn record_manual_payroll(
        &self,
        entry: ManualPayrollEntry,
    ) -> Result<(ManualPayrollEntry, ChangeSet), StoreError> {
        self.write(|w| {
            w.tables().mandate(entry.mandate_id)?;
            w.put(Row::ManualPayroll(entry.clone()));
            Ok(entry)
        })
    }

    /// Record an external payroll upload. Uploads are never overwritten.
    pub fn record_payroll_import(
        &self,
        import: PayrollImport,
    ) -> Result<(PayrollImport, ChangeSet), StoreError> {
        self.write(|w| {
            w.tables().mandate(import.mandate_id)?;
            let key = (import.mandate_id, import.import_date);
            if w.tables().payroll_imports.contains_key(&key) {
                return Err(StoreError::Conflict(format!(
                    "mandate {} already has an import at {}",
                    import.mandate_id, import.import_date
                )));
            }
            w.put(Row::PayrollImport(import.clone()));
            Ok(import)
        })
    }

    pub fn add_employee(
        &self,
        mandate: MandateId,
        name: &str,
        active: bool,
    ) -> Result<(Employee, ChangeSet), StoreError> {
        let name = require_name("employee", name)?;
        self.write(|w| {
            w.tables().mandate(mandate)?;
            let employee = Employee {
                id: EmployeeId::new(),
                mandate_id: mandate,
                name,
                active,
            };
            w.put(Row::Employee(employee.clone()));
            Ok(employee)
        })
    }

    pub fn set_employee_active(
        &self,
        id: EmployeeId,
        active: bool,
    ) -> Result<(Employee, ChangeSet), StoreError> {
        self.write(|w| {
            let employee = Employee {
                active,
                ..w.tables()
                    .employees
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found("employee", id))?
            };
            w.put(Row::Employee(employee.clone()));
            Ok(employee)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caboard_core::{LimitDimension, YearMonth};
    use caboard_entitlements::{PlanCatalog, TenantDirectory};
    use caboard_payroll::{PayrollReconciler, PayrollSourceKind};

    #[test]
    fn limit_checked_creations_stop_at_the_free_plan() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let (owner, _) = ledger
            .create_organization_with_owner("Acme", UserId::new())
            .unwrap();
        let org = owner.organization_id;

        let err = ledger
            .add_member_within_limits(org, UserId::new(), MemberRole::Member)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::LimitExceeded(ref c) if c.dimension == LimitDimension::Users && c.current == 1
        ));

        ledger.create_mandate_within_limits(org, "Bar").unwrap();
        let err = ledger.create_mandate_within_limits(org, "Café").unwrap_err();
        assert!(matches!(err, StoreError::LimitExceeded(_)));
        assert_eq!(ledger.mandates(org).len(), 1);

        let err = ledger
            .add_file_within_limits(org, "scan.pdf", 200 * 1024 * 1024)
            .unwrap_err();
        assert!(matches!(err, StoreError::LimitExceeded(_)));
        ledger.add_file_within_limits(org, "empty.txt", 0).unwrap();

        // Maintenance paths are not held to the plan.
        ledger.create_mandate(org, "Import").unwrap();
        assert_eq!(ledger.mandates(org).len(), 2);
    }

    #[test]
    fn limit_checked_creation_needs_an_existing_organization() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let err = ledger
            .create_mandate_within_limits(OrganizationId::new(), "Bar")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn membership_is_unique_per_user() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let (a, _) = ledger.create_organization("A").unwrap();
        let (b, _) = ledger.create_organization("B").unwrap();
        let user = UserId::new();
        ledger.add_member(a.id, user, MemberRole::Owner).unwrap();
        let err = ledger.add_member(b.id, user, MemberRole::Member).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(ledger.organization_of_user(user).unwrap(), Some(a.id));
    }

    #[test]
    fn founding_an_organization_is_all_or_nothing() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let owner = UserId::new();
        let (member, changes) = ledger.create_organization_with_owner("Acme", owner).unwrap();
        assert_eq!(member.role, MemberRole::Owner);
        assert_eq!(changes.applied().len(), 2);
        assert_eq!(ledger.organization_of_user(owner).unwrap(), Some(member.organization_id));

        // The owner already has an organization: nothing is created.
        let err = ledger.create_organization_with_owner("Other", owner).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(ledger.organizations().len(), 1);
    }

    #[test]
    fn usage_tracks_members_mandates_and_storage() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let (org, _) = ledger.create_organization("Acme").unwrap();
        let u1 = UserId::new();
        ledger.add_member(org.id, u1, MemberRole::Owner).unwrap();
        ledger.add_member(org.id, UserId::new(), MemberRole::Member).unwrap();
        ledger.create_mandate(org.id, "Hotel").unwrap();
        let (file, _) = ledger.add_file(org.id, "menu.pdf", 2_048).unwrap();
        ledger.add_file(org.id, "logo.png", 1_024).unwrap();

        assert_eq!(ledger.usage(org.id, LimitDimension::Users).unwrap(), 2);
        assert_eq!(ledger.usage(org.id, LimitDimension::Mandates).unwrap(), 1);
        assert_eq!(ledger.usage(org.id, LimitDimension::Storage).unwrap(), 3_072);

        ledger.remove_member(u1).unwrap();
        ledger.remove_file(file.id).unwrap();
        assert_eq!(ledger.usage(org.id, LimitDimension::Users).unwrap(), 1);
        assert_eq!(ledger.usage(org.id, LimitDimension::Storage).unwrap(), 1_024);
    }

    #[test]
    fn blank_names_are_rejected() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        assert!(matches!(
            ledger.create_organization("   "),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn mandate_requires_organization() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let err = ledger.create_mandate(OrganizationId::new(), "X").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "organization", .. }));
    }

    #[test]
    fn reconciler_reads_ledger_payroll() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let (org, _) = ledger.create_organization("Acme").unwrap();
        let (mandate, _) = ledger.create_mandate(org.id, "Bistro").unwrap();
        for n in 0..3 {
            ledger.add_employee(mandate.id, &format!("cook {n}"), true).unwrap();
        }
        let reconciler = PayrollReconciler::new(&ledger);
        let r = reconciler.resolve_authoritative_payroll(mandate.id).unwrap();
        assert_eq!(r.employee_count, Some(3));
        assert_eq!(r.source, Some(PayrollSourceKind::Employees));

        ledger
            .record_manual_payroll(ManualPayrollEntry {
                mandate_id: mandate.id,
                period: YearMonth::new(2024, 6).unwrap(),
                employee_count: 5,
                gross_payroll: Cents(1_000_000),
            })
            .unwrap();
        let r = reconciler.resolve_authoritative_payroll(mandate.id).unwrap();
        assert_eq!(r.employee_count, Some(5));

        ledger
            .record_payroll_import(PayrollImport {
                mandate_id: mandate.id,
                import_date: Timestamp::parse("2024-07-01T00:00:00Z").unwrap(),
                total_employees: 8,
                period: None,
                gross_payroll: Cents(1_600_000),
            })
            .unwrap();
        let r = reconciler.resolve_authoritative_payroll(mandate.id).unwrap();
        assert_eq!(r.employee_count, Some(8));
        assert_eq!(r.source, Some(PayrollSourceKind::Import));
    }

    #[test]
    fn duplicate_import_conflicts() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let (org, _) = ledger.create_organization("Acme").unwrap();
        let (mandate, _) = ledger.create_mandate(org.id, "Bistro").unwrap();
        let import = PayrollImport {
            mandate_id: mandate.id,
            import_date: Timestamp::parse("2024-07-01T08:00:00Z").unwrap(),
            total_employees: 8,
            period: None,
            gross_payroll: Cents(1),
        };
        ledger.record_payroll_import(import.clone()).unwrap();
        assert!(matches!(
            ledger.record_payroll_import(import),
            Err(StoreError::Conflict(_))
        ));
    }
}
