use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use caboard_core::{Cents, EmployeeId, MandateId, YearMonth};

use crate::error::PayrollError;
use crate::records::{Employee, ManualPayrollEntry, PayrollImport};
use crate::source::PayrollSource;

#[derive(Default)]
pub(crate) struct FixtureSource {
    mandates: RefCell<HashSet<MandateId>>,
    manual: RefCell<Vec<ManualPayrollEntry>>,
    imports: RefCell<Vec<PayrollImport>>,
    employees: RefCell<Vec<Employee>>,
    revenue: RefCell<HashMap<(MandateId, YearMonth), Cents>>,
}

impl FixtureSource {
    pub fn add_mandate(&self) -> MandateId {
        let id = MandateId::new();
        self.mandates.borrow_mut().insert(id);
        id
    }

    pub fn add_manual(&self, entry: ManualPayrollEntry) {
        self.manual.borrow_mut().push(entry);
    }

    pub fn add_import(&self, import: PayrollImport) {
        self.imports.borrow_mut().push(import);
    }

    pub fn add_employees(&self, mandate: MandateId, count: usize, active: bool) {
        let mut employees = self.employees.borrow_mut();
        for n in 0..count {
            employees.push(Employee {
                id: EmployeeId::new(),
                mandate_id: mandate,
                name: format!("employee {n}"),
                active,
            });
        }
    }

    pub fn set_revenue(&self, mandate: MandateId, period: YearMonth, amount: Cents) {
        self.revenue.borrow_mut().insert((mandate, period), amount);
    }
}

impl PayrollSource for FixtureSource {
    fn mandate_exists(&self, mandate: MandateId) -> Result<bool, PayrollError> {
        Ok(self.mandates.borrow().contains(&mandate))
    }

    fn manual_entries(&self, mandate: MandateId) -> Result<Vec<ManualPayrollEntry>, PayrollError> {
        Ok(self
            .manual
            .borrow()
            .iter()
            .filter(|e| e.mandate_id == mandate)
            .cloned()
            .collect())
    }

    fn imports(&self, mandate: MandateId) -> Result<Vec<PayrollImport>, PayrollError> {
        Ok(self
            .imports
            .borrow()
            .iter()
            .filter(|i| i.mandate_id == mandate)
            .cloned()
            .collect())
    }

    fn active_employee_count(&self, mandate: MandateId) -> Result<u64, PayrollError> {
        Ok(self
            .employees
            .borrow()
            .iter()
            .filter(|e| e.mandate_id == mandate && e.active)
            .count() as u64)
    }

    fn revenue_in_month(
        &self,
        mandate: MandateId,
        period: YearMonth,
    ) -> Result<Cents, PayrollError> {
        Ok(self
            .revenue
            .borrow()
            .get(&(mandate, period))
            .copied()
            .unwrap_or(Cents::ZERO))
    }
}
