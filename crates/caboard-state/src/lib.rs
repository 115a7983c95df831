//! # caboard-state: Lifecycle State Machines
//!
//! ## State Machines
//!
//! - **Subscription** (`subscription.rs`): an organization's binding to a
//!   plan. `Incomplete/Trialing -> Active -> PastDue -> Unpaid`, with
//!   `Canceled` and `Superseded` terminal branches. Only `Active` and
//!   `Trialing` grant the referenced plan; every other status resolves to
//!   the FREE fallback downstream.
//!
//! ## Design
//!
//! Status names are an enum, never strings. Every transition is a method
//! that validates the current status and appends a
//! [`SubscriptionTransitionRecord`] to the log, so the history of a
//! subscription survives plan changes (superseded rows are kept, not
//! deleted).

pub mod subscription;

pub use subscription::{
    Subscription, SubscriptionError, SubscriptionStatus, SubscriptionTransitionEvidence,
    SubscriptionTransitionRecord,
};
