//! Monthly payroll against revenue for one mandate.

use serde::{Deserialize, Serialize};

use caboard_core::{Cents, MandateId, YearMonth};

use crate::error::PayrollError;
use crate::reconciler::PayrollReconciler;
use crate::source::PayrollSource;

/// Payroll and revenue of one mandate for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPayrollSummary {
    pub mandate_id: MandateId,
    pub period: YearMonth,
    pub revenue: Cents,
    /// From the manual entry for this month, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_payroll: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    /// `gross_payroll / revenue` in percent, two decimals. Absent without
    /// payroll or with non-positive revenue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payroll_ratio_percent: Option<f64>,
}

impl<S: PayrollSource + ?Sized> PayrollReconciler<'_, S> {
    /// Revenue, manual payroll and their ratio for `year`-`month`.
    pub fn monthly_payroll_summary(
        &self,
        mandate: MandateId,
        year: i32,
        month: u32,
    ) -> Result<MonthlyPayrollSummary, PayrollError> {
        let period = YearMonth::new(year, month)?;
        self.require_mandate(mandate)?;
        let revenue = self.source.revenue_in_month(mandate, period)?;
        let entry = self
            .source
            .manual_entries(mandate)?
            .into_iter()
            .find(|e| e.period == period);
        let gross_payroll = entry.as_ref().map(|e| e.gross_payroll);
        Ok(MonthlyPayrollSummary {
            mandate_id: mandate,
            period,
            revenue,
            gross_payroll,
            employee_count: entry.as_ref().map(|e| e.employee_count),
            payroll_ratio_percent: gross_payroll.and_then(|g| g.percent_of(revenue)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ManualPayrollEntry;
    use crate::testing::FixtureSource;

    #[test]
    fn summary_combines_revenue_and_manual_payroll() {
        let src = FixtureSource::default();
        let m = src.add_mandate();
        let june = YearMonth::new(2024, 6).unwrap();
        src.add_manual(ManualPayrollEntry {
            mandate_id: m,
            period: june,
            employee_count: 4,
            gross_payroll: Cents(1_200_000),
        });
        src.set_revenue(m, june, Cents(4_000_000));

        let s = PayrollReconciler::new(&src)
            .monthly_payroll_summary(m, 2024, 6)
            .unwrap();
        assert_eq!(s.revenue, Cents(4_000_000));
        assert_eq!(s.gross_payroll, Some(Cents(1_200_000)));
        assert_eq!(s.employee_count, Some(4));
        assert_eq!(s.payroll_ratio_percent, Some(30.0));
    }

    #[test]
    fn zero_revenue_has_no_ratio() {
        let src = FixtureSource::default();
        let m = src.add_mandate();
        src.add_manual(ManualPayrollEntry {
            mandate_id: m,
            period: YearMonth::new(2024, 2).unwrap(),
            employee_count: 1,
            gross_payroll: Cents(100),
        });
        let s = PayrollReconciler::new(&src)
            .monthly_payroll_summary(m, 2024, 2)
            .unwrap();
        assert_eq!(s.revenue, Cents::ZERO);
        assert_eq!(s.payroll_ratio_percent, None);
    }

    #[test]
    fn month_without_entry_has_revenue_only() {
        let src = FixtureSource::default();
        let m = src.add_mandate();
        let s = PayrollReconciler::new(&src)
            .monthly_payroll_summary(m, 2024, 3)
            .unwrap();
        assert_eq!(s.gross_payroll, None);
        assert_eq!(s.employee_count, None);
    }

    #[test]
    fn invalid_month_is_rejected() {
        let src = FixtureSource::default();
        let m = src.add_mandate();
        let err = PayrollReconciler::new(&src)
            .monthly_payroll_summary(m, 2024, 13)
            .unwrap_err();
        assert!(matches!(err, PayrollError::Validation(_)));
    }
}
