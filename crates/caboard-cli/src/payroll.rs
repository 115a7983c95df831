//! # Payroll Subcommand
//!
//! Reads only. Recording payroll goes through the API, where the plan's
//! `payroll` feature is enforced.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use caboard_core::MandateId;
use caboard_payroll::{AuthorityRule, PayrollReconciler};
use caboard_store::Store;

use crate::print_json;

#[derive(Args, Debug)]
pub struct PayrollArgs {
    #[command(subcommand)]
    pub command: PayrollCommand,
}

/// Command-line spelling of [`AuthorityRule`].
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleArg {
    #[default]
    RecordedRecency,
    LatestPeriod,
}

impl From<RuleArg> for AuthorityRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::RecordedRecency => AuthorityRule::RecordedRecency,
            RuleArg::LatestPeriod => AuthorityRule::LatestPeriod,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum PayrollCommand {
    /// Which payroll source a dashboard should trust for a mandate.
    Authority {
        #[arg(long)]
        mandate: MandateId,
        #[arg(long, value_enum, default_value_t = RuleArg::RecordedRecency)]
        rule: RuleArg,
    },
    /// Revenue, manual payroll and their ratio for one month.
    Summary {
        #[arg(long)]
        mandate: MandateId,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
}

pub fn run_payroll(args: &PayrollArgs, store: &Store) -> Result<u8> {
    let reconciler = PayrollReconciler::new(store.ledger());
    match &args.command {
        PayrollCommand::Authority { mandate, rule } => {
            let authority = reconciler
                .with_rule((*rule).into())
                .resolve_authoritative_payroll(*mandate)?;
            print_json(&authority)?;
        }
        PayrollCommand::Summary {
            mandate,
            year,
            month,
        } => {
            print_json(&reconciler.monthly_payroll_summary(*mandate, *year, *month)?)?;
        }
    }
    Ok(0)
}
