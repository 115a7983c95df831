use caboard_core::{Cents, MandateId, YearMonth};

use crate::error::PayrollError;
use crate::records::{ManualPayrollEntry, PayrollImport};

/// Per-mandate payroll and revenue facts.
///
/// Implementations report a missing mandate through
/// [`mandate_exists`](Self::mandate_exists); the other lookups may assume
/// the mandate exists and return empty results otherwise.
pub trait PayrollSource {
    fn mandate_exists(&self, mandate: MandateId) -> Result<bool, PayrollError>;

    fn manual_entries(&self, mandate: MandateId) -> Result<Vec<ManualPayrollEntry>, PayrollError>;

    fn imports(&self, mandate: MandateId) -> Result<Vec<PayrollImport>, PayrollError>;

    /// Number of employee rows flagged active.
    fn active_employee_count(&self, mandate: MandateId) -> Result<u64, PayrollError>;

    /// Sum of the mandate's day values dated within `period`.
    fn revenue_in_month(&self, mandate: MandateId, period: YearMonth)
        -> Result<Cents, PayrollError>;
}
