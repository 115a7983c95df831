//! Payroll facts from the two origins, plus employee rows.

use serde::{Deserialize, Serialize};

use caboard_core::{Cents, EmployeeId, MandateId, Timestamp, YearMonth};

/// A payroll figure typed in by hand for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPayrollEntry {
    pub mandate_id: MandateId,
    /// Month the figure describes.
    pub period: YearMonth,
    pub employee_count: u32,
    pub gross_payroll: Cents,
}

/// A bulk upload from the external payroll system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollImport {
    pub mandate_id: MandateId,
    /// When the upload happened.
    pub import_date: Timestamp,
    pub total_employees: u32,
    /// Month the upload covers, when the file states one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<YearMonth>,
    pub gross_payroll: Cents,
}

/// An employee attached to a mandate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub mandate_id: MandateId,
    pub name: String,
    pub active: bool,
}
