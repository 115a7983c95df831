//! # Entitlement Subcommands
//!
//! `org` answers plan and limit questions for an organization; `features`
//! answers feature questions for a user. Both are read-only.

use anyhow::Result;
use clap::{Args, Subcommand};

use caboard_core::{Feature, LimitDimension, OrganizationId, UserId};
use caboard_store::Store;

use crate::backend::with_resolver;
use crate::print_json;

#[derive(Args, Debug)]
pub struct OrgArgs {
    #[command(subcommand)]
    pub command: OrgCommand,
}

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// Resolve the effective plan (FREE without an active subscription).
    Plan {
        #[arg(long)]
        org: OrganizationId,
    },
    /// Report one limit dimension. With `--increment`, check whether that
    /// many more units fit and exit 1 if not.
    Limit {
        #[arg(long)]
        org: OrganizationId,
        #[arg(long)]
        dimension: LimitDimension,
        #[arg(long)]
        increment: Option<u64>,
    },
    /// Report every limit dimension.
    Usage {
        #[arg(long)]
        org: OrganizationId,
    },
}

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    #[command(subcommand)]
    pub command: FeaturesCommand,
}

#[derive(Subcommand, Debug)]
pub enum FeaturesCommand {
    /// Check one feature. Exits 1 when denied.
    Check {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        feature: Feature,
    },
    /// Allow/deny for every feature.
    Report {
        #[arg(long)]
        user: UserId,
    },
}

pub fn run_org(args: &OrgArgs, store: &Store) -> Result<u8> {
    match &args.command {
        OrgCommand::Plan { org } => {
            print_json(&with_resolver(store, |r| r.resolve_effective_plan(*org))?)?;
            Ok(0)
        }
        OrgCommand::Limit {
            org,
            dimension,
            increment: None,
        } => {
            print_json(&with_resolver(store, |r| r.check_organization_limits(*org, *dimension))?)?;
            Ok(0)
        }
        OrgCommand::Limit {
            org,
            dimension,
            increment: Some(increment),
        } => {
            let check = with_resolver(store, |r| r.can_perform_action(*org, *dimension, *increment))?;
            print_json(&check)?;
            Ok(if check.allowed { 0 } else { 1 })
        }
        OrgCommand::Usage { org } => {
            print_json(&with_resolver(store, |r| r.organization_usage(*org))?)?;
            Ok(0)
        }
    }
}

pub fn run_features(args: &FeaturesArgs, store: &Store) -> Result<u8> {
    match &args.command {
        FeaturesCommand::Check { user, feature } => {
            match with_resolver(store, |r| r.denial(*user, *feature))? {
                None => {
                    print_json(&serde_json::json!({ "feature": feature, "allowed": true }))?;
                    Ok(0)
                }
                Some(denial) => {
                    print_json(&denial)?;
                    Ok(1)
                }
            }
        }
        FeaturesCommand::Report { user } => {
            print_json(&with_resolver(store, |r| r.feature_access_report(*user))?)?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caboard_core::{PlanTier, Timestamp};
    use caboard_entitlements::PlanCatalog;

    async fn tenant() -> (Store, UserId, OrganizationId) {
        let store = Store::in_memory(PlanCatalog::defaults());
        let owner = UserId::new();
        let member = store
            .create_organization_with_owner("Le Comptoir", owner)
            .await
            .unwrap();
        (store, owner, member.organization_id)
    }

    #[tokio::test]
    async fn limit_check_exits_one_when_refused() {
        let (store, _, org) = tenant().await;
        store.create_mandate(org, "Terrasse").await.unwrap();
        let args = OrgArgs {
            command: OrgCommand::Limit {
                org,
                dimension: LimitDimension::Mandates,
                increment: Some(1),
            },
        };
        assert_eq!(run_org(&args, &store).unwrap(), 1);

        store
            .change_plan(org, PlanTier::Premium, Timestamp::now(), None, None)
            .await
            .unwrap();
        assert_eq!(run_org(&args, &store).unwrap(), 0);
    }

    #[tokio::test]
    async fn limit_report_without_increment_always_succeeds() {
        let (store, _, org) = tenant().await;
        let args = OrgArgs {
            command: OrgCommand::Limit {
                org,
                dimension: LimitDimension::Users,
                increment: None,
            },
        };
        assert_eq!(run_org(&args, &store).unwrap(), 0);
    }

    #[tokio::test]
    async fn feature_check_follows_the_plan() {
        let (store, owner, org) = tenant().await;
        let args = FeaturesArgs {
            command: FeaturesCommand::Check {
                user: owner,
                feature: Feature::Payroll,
            },
        };
        assert_eq!(run_features(&args, &store).unwrap(), 1);

        store
            .change_plan(org, PlanTier::Illimite, Timestamp::now(), None, None)
            .await
            .unwrap();
        assert_eq!(run_features(&args, &store).unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_organization_is_an_error() {
        let (store, _, _) = tenant().await;
        let args = OrgArgs {
            command: OrgCommand::Usage {
                org: OrganizationId::new(),
            },
        };
        assert!(run_org(&args, &store).is_err());
    }
}
