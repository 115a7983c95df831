//! # Revenue Ledger
//!
//! The single writer of day values. Each mutation changes one day value
//! and stores the mandate's recomputed aggregates in the same write
//! section, so `total_revenue == sum(value)` and `last_entry == max(date)`
//! hold whenever the lock is released.
//!
//! Snapshots and database rows written by other tools can still carry
//! stale aggregates; [`Ledger::verify_aggregates`] reports them and
//! [`Ledger::repair_aggregates`] rewrites them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use caboard_core::{Cents, DayValueId, MandateId, ValidationError, YearMonth};

use crate::change::{ChangeSet, Row, RowKey};
use crate::error::StoreError;
use crate::ledger::{Ledger, Tables, Writer};
use crate::records::{DayValue, Mandate};

/// Largest accepted day value: ten billion in cents.
pub const MAX_DAY_VALUE: Cents = Cents(1_000_000_000_000);

/// A mandate whose cached aggregates differ from its day values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDrift {
    pub mandate_id: MandateId,
    pub cached_total: Cents,
    pub actual_total: Cents,
    pub cached_last_entry: Option<NaiveDate>,
    pub actual_last_entry: Option<NaiveDate>,
}

/// Revenue of one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub period: YearMonth,
    pub total: Cents,
    pub entries: u32,
}

fn check_value(value: Cents) -> Result<(), ValidationError> {
    if value < Cents::ZERO || value > MAX_DAY_VALUE {
        return Err(ValidationError::Invalid(format!(
            "day value {value} outside 0..={MAX_DAY_VALUE}"
        )));
    }
    Ok(())
}

/// `(sum(value), max(date))` over a mandate's day values.
fn aggregates(tables: &Tables, mandate: MandateId) -> (Cents, Option<NaiveDate>) {
    tables
        .day_values_of(mandate)
        .fold((Cents::ZERO, None), |(total, _), d| {
            (Cents(total.get().saturating_add(d.value.get())), Some(d.date))
        })
}

fn drift(tables: &Tables, mandate: &Mandate) -> Option<AggregateDrift> {
    let (actual_total, actual_last_entry) = aggregates(tables, mandate.id);
    if actual_total == mandate.total_revenue && actual_last_entry == mandate.last_entry {
        return None;
    }
    Some(AggregateDrift {
        mandate_id: mandate.id,
        cached_total: mandate.total_revenue,
        actual_total,
        cached_last_entry: mandate.last_entry,
        actual_last_entry,
    })
}

impl Tables {
    /// Overwrite a mandate's cached aggregates with the ones derived from
    /// its day values. No-op for an absent mandate.
    pub(crate) fn resync_aggregates(&mut self, mandate: MandateId) {
        let (total_revenue, last_entry) = aggregates(self, mandate);
        if let Some(m) = self.mandates.get_mut(&mandate) {
            m.total_revenue = total_revenue;
            m.last_entry = last_entry;
        }
    }
}

impl Writer<'_> {
    /// Recompute and store the mandate's aggregates.
    fn refresh_aggregates(&mut self, mandate: MandateId) -> Result<Mandate, StoreError> {
        let (total_revenue, last_entry) = aggregates(self.tables(), mandate);
        let updated = Mandate {
            total_revenue,
            last_entry,
            ..self.tables().mandate(mandate)?.clone()
        };
        self.put(Row::Mandate(updated.clone()));
        Ok(updated)
    }

    fn day_value(&self, id: DayValueId) -> Result<DayValue, StoreError> {
        self.tables()
            .day_values
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("day value", id))
    }
}

impl Ledger {
    /// Record a mandate's revenue for `date`. At most one per date.
    pub fn record_day_value(
        &self,
        mandate: MandateId,
        date: NaiveDate,
        value: Cents,
    ) -> Result<(DayValue, ChangeSet), StoreError> {
        check_value(value)?;
        self.write(|w| {
            w.tables().mandate(mandate)?;
            if w.tables().day_index.contains_key(&(mandate, date)) {
                return Err(StoreError::Conflict(format!(
                    "mandate {mandate} already has a value for {date}"
                )));
            }
            let row = DayValue {
                id: DayValueId::new(),
                mandate_id: mandate,
                date,
                value,
            };
            w.put(Row::DayValue(row.clone()));
            w.refresh_aggregates(mandate)?;
            Ok(row)
        })
    }

    /// Replace the amount of an existing day value.
    pub fn update_day_value(
        &self,
        id: DayValueId,
        value: Cents,
    ) -> Result<(DayValue, ChangeSet), StoreError> {
        check_value(value)?;
        self.write(|w| {
            let row = DayValue {
                value,
                ..w.day_value(id)?
            };
            w.put(Row::DayValue(row.clone()));
            w.refresh_aggregates(row.mandate_id)?;
            Ok(row)
        })
    }

    /// Delete a day value.
    pub fn delete_day_value(&self, id: DayValueId) -> Result<(DayValue, ChangeSet), StoreError> {
        self.write(|w| {
            let row = w.day_value(id)?;
            w.delete(RowKey::DayValue(id));
            w.refresh_aggregates(row.mandate_id)?;
            Ok(row)
        })
    }

    /// Recompute and store one mandate's aggregates.
    pub fn recompute_aggregates(
        &self,
        mandate: MandateId,
    ) -> Result<(Mandate, ChangeSet), StoreError> {
        self.write(|w| w.refresh_aggregates(mandate))
    }

    /// Every mandate whose cached aggregates are stale.
    pub fn verify_aggregates(&self) -> Vec<AggregateDrift> {
        let mut drifts: Vec<_> = self.read(|t| {
            t.mandates
                .values()
                .filter_map(|m| drift(t, m))
                .collect()
        });
        drifts.sort_by_key(|d| d.mandate_id);
        for d in &drifts {
            tracing::warn!(
                mandate = %d.mandate_id,
                cached_total = %d.cached_total,
                actual_total = %d.actual_total,
                "mandate aggregates drifted from day values"
            );
        }
        drifts
    }

    /// Recompute every drifted mandate. Returns what was repaired.
    pub fn repair_aggregates(&self) -> Result<(Vec<AggregateDrift>, ChangeSet), StoreError> {
        self.write(|w| {
            let mut drifts: Vec<_> = w
                .tables()
                .mandates
                .values()
                .filter_map(|m| drift(w.tables(), m))
                .collect();
            drifts.sort_by_key(|d| d.mandate_id);
            for d in &drifts {
                w.refresh_aggregates(d.mandate_id)?;
            }
            if !drifts.is_empty() {
                tracing::info!(repaired = drifts.len(), "mandate aggregates repaired");
            }
            Ok(drifts)
        })
    }

    /// Per-month revenue of a mandate for `year`, January to December.
    pub fn monthly_revenue(
        &self,
        mandate: MandateId,
        year: i32,
    ) -> Result<Vec<MonthlyRevenue>, StoreError> {
        let mut period = YearMonth::new(year, 1)?;
        self.read(|t| {
            t.mandate(mandate)?;
            let mut months = Vec::with_capacity(12);
            for _ in 0..12 {
                let (total, entries) = t
                    .day_index
                    .range((mandate, period.first_day())..=(mandate, period.last_day()))
                    .filter_map(|(_, id)| t.day_values.get(id))
                    .fold((Cents::ZERO, 0u32), |(total, n), d| {
                        (Cents(total.get().saturating_add(d.value.get())), n + 1)
                    });
                months.push(MonthlyRevenue {
                    period,
                    total,
                    entries,
                });
                period = period.next();
            }
            Ok(months)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caboard_entitlements::PlanCatalog;
    use proptest::prelude::*;

    fn ledger_with_mandate() -> (Ledger, MandateId) {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let (org, _) = ledger.create_organization("Acme").unwrap();
        let (mandate, _) = ledger.create_mandate(org.id, "Hotel du Lac").unwrap();
        (ledger, mandate.id)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn record_updates_aggregates() {
        let (ledger, m) = ledger_with_mandate();
        ledger.record_day_value(m, date(2024, 6, 2), Cents(1_000)).unwrap();
        ledger.record_day_value(m, date(2024, 6, 1), Cents(500)).unwrap();
        let mandate = ledger.mandate(m).unwrap();
        assert_eq!(mandate.total_revenue, Cents(1_500));
        assert_eq!(mandate.last_entry, Some(date(2024, 6, 2)));
    }

    #[test]
    fn duplicate_date_conflicts_and_changes_nothing() {
        let (ledger, m) = ledger_with_mandate();
        ledger.record_day_value(m, date(2024, 6, 1), Cents(500)).unwrap();
        let err = ledger
            .record_day_value(m, date(2024, 6, 1), Cents(700))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(ledger.mandate(m).unwrap().total_revenue, Cents(500));
        assert_eq!(ledger.day_values(m).unwrap().len(), 1);
    }

    #[test]
    fn update_and_delete_keep_aggregates_exact() {
        let (ledger, m) = ledger_with_mandate();
        let (a, _) = ledger.record_day_value(m, date(2024, 1, 5), Cents(100)).unwrap();
        let (b, _) = ledger.record_day_value(m, date(2024, 2, 5), Cents(200)).unwrap();
        ledger.update_day_value(a.id, Cents(150)).unwrap();
        assert_eq!(ledger.mandate(m).unwrap().total_revenue, Cents(350));
        ledger.delete_day_value(b.id).unwrap();
        let mandate = ledger.mandate(m).unwrap();
        assert_eq!(mandate.total_revenue, Cents(150));
        assert_eq!(mandate.last_entry, Some(date(2024, 1, 5)));
        ledger.delete_day_value(a.id).unwrap();
        let mandate = ledger.mandate(m).unwrap();
        assert_eq!(mandate.total_revenue, Cents::ZERO);
        assert_eq!(mandate.last_entry, None);
    }

    #[test]
    fn negative_values_are_rejected() {
        let (ledger, m) = ledger_with_mandate();
        let err = ledger
            .record_day_value(m, date(2024, 1, 1), Cents(-1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn unknown_mandate_is_not_found() {
        let ledger = Ledger::new(PlanCatalog::defaults());
        let err = ledger
            .record_day_value(MandateId::new(), date(2024, 1, 1), Cents(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "mandate", .. }));
    }

    #[test]
    fn reverting_an_earlier_write_keeps_a_later_one_in_the_aggregates() {
        let (ledger, m) = ledger_with_mandate();
        let (_, first) = ledger.record_day_value(m, date(2024, 6, 1), Cents(100)).unwrap();
        ledger.record_day_value(m, date(2024, 6, 2), Cents(200)).unwrap();

        ledger.revert(first);

        let values: Vec<_> = ledger
            .day_values(m)
            .unwrap()
            .into_iter()
            .map(|d| (d.date, d.value))
            .collect();
        assert_eq!(values, vec![(date(2024, 6, 2), Cents(200))]);
        let mandate = ledger.mandate(m).unwrap();
        assert_eq!(mandate.total_revenue, Cents(200));
        assert_eq!(mandate.last_entry, Some(date(2024, 6, 2)));
        assert!(ledger.verify_aggregates().is_empty());
    }

    #[test]
    fn reverting_a_delete_restores_the_value_and_its_aggregates() {
        let (ledger, m) = ledger_with_mandate();
        let (a, _) = ledger.record_day_value(m, date(2024, 6, 1), Cents(100)).unwrap();
        let (_, removal) = ledger.delete_day_value(a.id).unwrap();
        ledger.record_day_value(m, date(2024, 6, 3), Cents(50)).unwrap();

        ledger.revert(removal);

        let mandate = ledger.mandate(m).unwrap();
        assert_eq!(mandate.total_revenue, Cents(150));
        assert_eq!(mandate.last_entry, Some(date(2024, 6, 3)));
        assert!(ledger.verify_aggregates().is_empty());
    }

    #[test]
    fn verify_and_repair_fix_stale_cache() {
        let (ledger, m) = ledger_with_mandate();
        ledger.record_day_value(m, date(2024, 3, 3), Cents(900)).unwrap();
        ledger
            .write(|w| {
                let stale = Mandate {
                    total_revenue: Cents(1),
                    ..w.tables().mandate(m)?.clone()
                };
                w.put(Row::Mandate(stale));
                Ok(())
            })
            .unwrap();

        let drift = ledger.verify_aggregates();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].cached_total, Cents(1));
        assert_eq!(drift[0].actual_total, Cents(900));

        let (repaired, changes) = ledger.repair_aggregates().unwrap();
        assert_eq!(repaired.len(), 1);
        assert!(!changes.is_empty());
        assert!(ledger.verify_aggregates().is_empty());
    }

    #[test]
    fn monthly_revenue_buckets_by_month() {
        let (ledger, m) = ledger_with_mandate();
        ledger.record_day_value(m, date(2024, 1, 31), Cents(100)).unwrap();
        ledger.record_day_value(m, date(2024, 2, 1), Cents(200)).unwrap();
        ledger.record_day_value(m, date(2024, 2, 29), Cents(300)).unwrap();
        ledger.record_day_value(m, date(2025, 2, 1), Cents(999)).unwrap();
        let months = ledger.monthly_revenue(m, 2024).unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].total, Cents(100));
        assert_eq!(months[1].total, Cents(500));
        assert_eq!(months[1].entries, 2);
        assert_eq!(months[2].total, Cents::ZERO);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Record(u16, i64),
        Update(usize, i64),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u16..400, 0i64..1_000_000).prop_map(|(d, v)| Op::Record(d, v)),
            (any::<usize>(), 0i64..1_000_000).prop_map(|(i, v)| Op::Update(i, v)),
            any::<usize>().prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn cached_aggregates_match_recomputation(ops in prop::collection::vec(op(), 0..60)) {
            let (ledger, m) = ledger_with_mandate();
            let base = date(2024, 1, 1);
            for op in ops {
                let ids: Vec<_> = ledger.day_values(m).unwrap().iter().map(|d| d.id).collect();
                match op {
                    Op::Record(offset, v) => {
                        let day = base + chrono::Duration::days(i64::from(offset));
                        let _ = ledger.record_day_value(m, day, Cents(v));
                    }
                    Op::Update(i, v) if !ids.is_empty() => {
                        ledger.update_day_value(ids[i % ids.len()], Cents(v)).unwrap();
                    }
                    Op::Delete(i) if !ids.is_empty() => {
                        ledger.delete_day_value(ids[i % ids.len()]).unwrap();
                    }
                    _ => {}
                }
            }
            let values = ledger.day_values(m).unwrap();
            let mandate = ledger.mandate(m).unwrap();
            prop_assert_eq!(mandate.total_revenue, values.iter().map(|d| d.value).sum::<Cents>());
            prop_assert_eq!(mandate.last_entry, values.iter().map(|d| d.date).max());
            prop_assert!(ledger.verify_aggregates().is_empty());
        }
    }
}
