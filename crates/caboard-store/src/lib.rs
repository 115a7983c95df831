//! # caboard-store: Tenant Ledger
//!
//! The rows the entitlement and payroll crates read: organizations,
//! memberships, subscriptions, mandates with their day values, stored
//! files and payroll facts.
//!
//! - [`Ledger`]: in-memory tables behind one `RwLock`. Implements
//!   [`caboard_entitlements::TenantDirectory`] and
//!   [`caboard_payroll::PayrollSource`]. Every mutation returns a
//!   [`ChangeSet`] describing the rows it wrote.
//! - [`Store`]: the ledger plus a durable backend (Postgres via `sqlx`, a
//!   JSON snapshot file, or nothing). Persists each change set and
//!   reverts it in memory when persistence fails.
//!
//! The revenue ledger keeps `Mandate::total_revenue` and
//! `Mandate::last_entry` equal to `sum(value)` and `max(date)` over the
//! mandate's day values: day-value writes and the aggregate refresh are
//! one change set.

pub mod change;
pub mod db;
pub mod error;
pub mod ledger;
pub mod plans;
pub mod records;
pub mod revenue;
pub mod snapshot;
pub mod store;
pub mod subscriptions;
pub mod tenants;

pub use change::{Change, ChangeSet, Row, RowKey};
pub use error::StoreError;
pub use ledger::Ledger;
pub use records::{DayValue, Mandate, MemberRole, Organization, OrganizationUser, StoredFile};
pub use revenue::{AggregateDrift, MonthlyRevenue, MAX_DAY_VALUE};
pub use snapshot::Snapshot;
pub use store::Store;
pub use subscriptions::SubscriptionAction;
