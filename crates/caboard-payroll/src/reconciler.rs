//! # Payroll Source Reconciler
//!
//! Picks the authoritative employee count for a mandate out of the latest
//! manual entry, the latest import, and the live employee rows.
//!
//! ## Authority rules
//!
//! [`AuthorityRule::RecordedRecency`] (default) compares the manual
//! entry's month, taken as its first instant (`YYYY-MM-01T00:00:00Z`),
//! against the import's upload timestamp. The import wins only if it is
//! strictly later; ties go to the manual entry. This compares a period with
//! an event: a June entry typed on June 30th still loses to an import
//! uploaded on June 2nd. The behaviour is kept as the default because
//! dashboards depend on it.
//!
//! [`AuthorityRule::LatestPeriod`] compares periods with periods: the
//! manual month against the month the import covers (or the month of its
//! upload when it states none). Ties go to the import.
//!
//! With only one source present, that source wins. With neither, the count
//! of active employees is used when nonzero.

use serde::{Deserialize, Serialize};

use caboard_core::{MandateId, Timestamp, YearMonth};

use crate::error::PayrollError;
use crate::records::{ManualPayrollEntry, PayrollImport};
use crate::source::PayrollSource;

/// How to choose between a manual entry and an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityRule {
    #[default]
    RecordedRecency,
    LatestPeriod,
}

/// Where the authoritative count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollSourceKind {
    Manual,
    Import,
    Employees,
}

/// Result of [`PayrollReconciler::resolve_authoritative_payroll`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativePayroll {
    pub mandate_id: MandateId,
    /// `None` when no source has data.
    pub employee_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PayrollSourceKind>,
    /// Period of the winning manual entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<YearMonth>,
    /// Upload time of the winning import.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_date: Option<Timestamp>,
    pub rule: AuthorityRule,
}

/// Whether `import` takes precedence over `manual` under `rule`.
pub fn import_wins(rule: AuthorityRule, manual: &ManualPayrollEntry, import: &PayrollImport) -> bool {
    match rule {
        AuthorityRule::RecordedRecency => import.import_date > manual.period.first_instant(),
        AuthorityRule::LatestPeriod => {
            let covered = import
                .period
                .unwrap_or_else(|| YearMonth::of(import.import_date.date()));
            covered >= manual.period
        }
    }
}

/// Latest manual entry by period.
pub fn latest_manual(entries: &[ManualPayrollEntry]) -> Option<&ManualPayrollEntry> {
    entries.iter().max_by_key(|e| e.period)
}

/// Latest import by upload time.
pub fn latest_import(imports: &[PayrollImport]) -> Option<&PayrollImport> {
    imports.iter().max_by_key(|i| i.import_date)
}

/// Payroll reconciliation over a [`PayrollSource`].
#[derive(Debug)]
pub struct PayrollReconciler<'a, S: ?Sized> {
    pub(crate) source: &'a S,
    rule: AuthorityRule,
}

impl<'a, S: PayrollSource + ?Sized> PayrollReconciler<'a, S> {
    /// Reconciler using [`AuthorityRule::RecordedRecency`].
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            rule: AuthorityRule::default(),
        }
    }

    /// Switch the authority rule.
    pub fn with_rule(mut self, rule: AuthorityRule) -> Self {
        self.rule = rule;
        self
    }

    pub(crate) fn require_mandate(&self, mandate: MandateId) -> Result<(), PayrollError> {
        if self.source.mandate_exists(mandate)? {
            Ok(())
        } else {
            Err(PayrollError::MandateNotFound(mandate))
        }
    }

    /// The employee count dashboards should display for `mandate`.
    pub fn resolve_authoritative_payroll(
        &self,
        mandate: MandateId,
    ) -> Result<AuthoritativePayroll, PayrollError> {
        self.require_mandate(mandate)?;
        let entries = self.source.manual_entries(mandate)?;
        let imports = self.source.imports(mandate)?;

        let empty = || AuthoritativePayroll {
            mandate_id: mandate,
            employee_count: None,
            source: None,
            period: None,
            import_date: None,
            rule: self.rule,
        };
        let from_manual = |m: &ManualPayrollEntry| AuthoritativePayroll {
            employee_count: Some(m.employee_count),
            source: Some(PayrollSourceKind::Manual),
            period: Some(m.period),
            ..empty()
        };
        let from_import = |i: &PayrollImport| AuthoritativePayroll {
            employee_count: Some(i.total_employees),
            source: Some(PayrollSourceKind::Import),
            import_date: Some(i.import_date),
            ..empty()
        };

        let resolved = match (latest_manual(&entries), latest_import(&imports)) {
            (Some(m), Some(i)) if import_wins(self.rule, m, i) => from_import(i),
            (Some(m), _) => from_manual(m),
            (None, Some(i)) => from_import(i),
            (None, None) => {
                let active = self.source.active_employee_count(mandate)?;
                if active == 0 {
                    empty()
                } else {
                    AuthoritativePayroll {
                        employee_count: Some(u32::try_from(active).unwrap_or(u32::MAX)),
                        source: Some(PayrollSourceKind::Employees),
                        ..empty()
                    }
                }
            }
        };
        tracing::debug!(
            mandate = %mandate,
            source = ?resolved.source,
            employee_count = ?resolved.employee_count,
            "resolved authoritative payroll"
        );
        Ok(resolved)
    }
}
