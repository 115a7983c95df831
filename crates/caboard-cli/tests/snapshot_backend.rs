//! The CLI sees what an earlier process wrote to a snapshot file.

use caboard_cli::backend::BackendArgs;
use caboard_cli::entitlements::{run_org, OrgArgs, OrgCommand};
use caboard_cli::maintenance::{run_aggregates, AggregatesArgs, AggregatesCommand};
use caboard_core::{Cents, LimitDimension, UserId};
use caboard_entitlements::PlanCatalog;
use caboard_store::Store;
use chrono::NaiveDate;

#[tokio::test]
async fn reopened_snapshot_keeps_tenants_and_aggregates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("caboard.json");

    let writer = Store::open_snapshot(&path, PlanCatalog::defaults()).unwrap();
    let member = writer
        .create_organization_with_owner("Le Comptoir", UserId::new())
        .await
        .unwrap();
    let mandate = writer
        .create_mandate(member.organization_id, "Terrasse")
        .await
        .unwrap();
    writer
        .record_day_value(
            mandate.id,
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            Cents(42_000),
        )
        .await
        .unwrap();

    let args = BackendArgs {
        snapshot: Some(path),
        ..BackendArgs::default()
    };
    let reader = args.open().await.unwrap();
    assert_eq!(reader.ledger().mandate(mandate.id).unwrap().total_revenue, Cents(42_000));

    let verify = AggregatesArgs {
        command: AggregatesCommand::Verify,
    };
    assert_eq!(run_aggregates(&verify, &reader).await.unwrap(), 0);

    // FREE allows one mandate; a second does not fit.
    let check = OrgArgs {
        command: OrgCommand::Limit {
            org: member.organization_id,
            dimension: LimitDimension::Mandates,
            increment: Some(1),
        },
    };
    assert_eq!(run_org(&check, &reader).unwrap(), 1);
}
