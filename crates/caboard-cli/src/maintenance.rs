//! # Maintenance Subcommands
//!
//! Jobs an operator or scheduler runs against the store:
//!
//! - `aggregates verify` exits 1 when any mandate's cached revenue
//!   disagrees with its day values; `aggregates repair` rewrites them.
//! - `subscriptions expire-lapsed` cancels subscriptions whose billing
//!   window has ended; `change-plan` and `cancel` act on one organization.

use anyhow::Result;
use clap::{Args, Subcommand};

use caboard_core::{OrganizationId, PlanTier, Timestamp};
use caboard_state::SubscriptionTransitionEvidence;
use caboard_store::{Store, SubscriptionAction};

use crate::print_json;

#[derive(Args, Debug)]
pub struct AggregatesArgs {
    #[command(subcommand)]
    pub command: AggregatesCommand,
}

#[derive(Subcommand, Debug)]
pub enum AggregatesCommand {
    /// Report mandates whose cached aggregates drifted.
    Verify,
    /// Recompute drifted aggregates.
    Repair,
}

#[derive(Args, Debug)]
pub struct SubscriptionsArgs {
    #[command(subcommand)]
    pub command: SubscriptionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SubscriptionsCommand {
    /// Cancel ACTIVE or TRIALING subscriptions whose period has ended.
    ExpireLapsed {
        /// Reference instant, RFC 3339. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
    /// Replace the organization's subscription with an ACTIVE one on `tier`.
    ChangePlan {
        #[arg(long)]
        org: OrganizationId,
        #[arg(long)]
        tier: PlanTier,
        #[arg(long)]
        actor: Option<String>,
    },
    /// Cancel the organization's live subscription.
    Cancel {
        #[arg(long)]
        org: OrganizationId,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        actor: Option<String>,
    },
}

pub async fn run_aggregates(args: &AggregatesArgs, store: &Store) -> Result<u8> {
    match args.command {
        AggregatesCommand::Verify => {
            let drifts = store.ledger().verify_aggregates();
            print_json(&drifts)?;
            Ok(if drifts.is_empty() { 0 } else { 1 })
        }
        AggregatesCommand::Repair => {
            let repaired = store.repair_aggregates().await?;
            print_json(&repaired)?;
            Ok(0)
        }
    }
}

pub async fn run_subscriptions(args: &SubscriptionsArgs, store: &Store) -> Result<u8> {
    match &args.command {
        SubscriptionsCommand::ExpireLapsed { at } => {
            let now = match at {
                Some(raw) => Timestamp::parse(raw)?,
                None => Timestamp::now(),
            };
            let expired = store.expire_lapsed(now).await?;
            tracing::info!(expired = expired.len(), "lapsed subscriptions canceled");
            print_json(&expired)?;
        }
        SubscriptionsCommand::ChangePlan { org, tier, actor } => {
            let sub = store
                .change_plan(*org, *tier, Timestamp::now(), None, actor.clone())
                .await?;
            print_json(&sub)?;
        }
        SubscriptionsCommand::Cancel { org, reason, actor } => {
            let evidence = SubscriptionTransitionEvidence {
                reason: reason.clone(),
                actor: actor.clone(),
            };
            let sub = store
                .transition_subscription(*org, SubscriptionAction::Cancel, evidence)
                .await?;
            print_json(&sub)?;
        }
    }
    Ok(0)
}
