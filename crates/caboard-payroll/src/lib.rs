//! # caboard-payroll
//!
//! Payroll figures reach a mandate from two places: monthly entries typed
//! in by hand and bulk uploads from the external payroll system. This crate
//! decides which one dashboards display, and relates a month's payroll to
//! the same month's revenue.

pub mod error;
pub mod reconciler;
pub mod records;
pub mod source;
pub mod summary;

#[cfg(test)]
mod testing;

pub use error::PayrollError;
pub use reconciler::{
    import_wins, latest_import, latest_manual, AuthoritativePayroll, AuthorityRule,
    PayrollReconciler, PayrollSourceKind,
};
pub use records::{Employee, ManualPayrollEntry, PayrollImport};
pub use source::PayrollSource;
pub use summary::MonthlyPayrollSummary;
