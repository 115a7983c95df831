//! # caboard-core: Foundational Types
//!
//! Leaf crate of the caboard workspace. Every other crate depends on it; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `OrganizationId`, `UserId`, `MandateId`,
//!    `PlanId`, `SubscriptionId`. You cannot pass a mandate where an
//!    organization is expected.
//!
//! 2. **Closed enumerations.** Plan tiers ([`PlanTier`]), gated features
//!    ([`Feature`]) and limit dimensions ([`LimitDimension`]) are enums with
//!    exhaustive `match` everywhere. Raw strings are parsed once, at the
//!    boundary, and a typo is a [`ValidationError`], never a silent `false`.
//!
//! 3. **Integer money.** Revenue and payroll amounts are [`Cents`]. Sums over
//!    day values are exact, so cached aggregates can be compared for equality.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `caboard-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod dimension;
pub mod error;
pub mod feature;
pub mod identity;
pub mod money;
pub mod temporal;
pub mod tier;

pub use dimension::LimitDimension;
pub use error::{CoreError, ValidationError};
pub use feature::Feature;
pub use identity::{
    DayValueId, EmployeeId, FileId, MandateId, OrganizationId, PlanId, SubscriptionId, UserId,
};
pub use money::Cents;
pub use temporal::{Timestamp, YearMonth};
pub use tier::PlanTier;
