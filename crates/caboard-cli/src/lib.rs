//! # caboard-cli: Operator Command-Line Interface
//!
//! Runs the same domain operations as the HTTP API directly against a
//! store, for operators and scheduled jobs.
//!
//! ## Subcommands
//!
//! - `plans`: list or seed the plan catalog
//! - `org`: effective plan, limit checks and usage of an organization
//! - `features`: feature checks for a user
//! - `payroll`: authoritative payroll and monthly summaries
//! - `aggregates`: verify or repair cached mandate revenue
//! - `subscriptions`: plan changes, cancellation and lapse expiry
//!
//! Every handler returns the process exit code: 0 on success, 1 when the
//! answer is negative (a refused action, drifted aggregates). The binary
//! exits 2 when a command fails.

pub mod backend;
pub mod entitlements;
pub mod maintenance;
pub mod payroll;
pub mod plans;

use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
