//! # Money
//!
//! Amounts are integer cents. Floats never enter revenue or payroll
//! arithmetic, so a recomputed total compares exactly against a cached one.

use serde::{Deserialize, Serialize};

/// An amount in cents (1/100 of the reporting currency).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    /// Zero.
    pub const ZERO: Cents = Cents(0);

    /// Raw cent count.
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Checked addition; `None` on overflow.
    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    /// Ratio `self / denominator` in percent, rounded to two decimals.
    /// `None` when the denominator is not positive.
    pub fn percent_of(&self, denominator: Cents) -> Option<f64> {
        if denominator.0 <= 0 {
            return None;
        }
        let pct = self.0 as f64 * 100.0 / denominator.0 as f64;
        Some((pct * 100.0).round() / 100.0)
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Self {
        Cents(iter.map(|c| c.0).sum())
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
