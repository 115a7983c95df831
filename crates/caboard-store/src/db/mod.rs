//! # Database Persistence Layer
//!
//! Postgres persistence for the tenant ledger via SQLx.
//!
//! The database is **optional**. When a database URL is configured, every
//! ledger mutation is written through in one transaction and the ledger
//! is hydrated from the database on startup. Without one, the ledger lives
//! in memory only (development, tests, snapshot-driven CLI runs).
//!
//! Table modules expose `put` functions (insert or update by primary key)
//! and loaders. [`persist`] routes a [`ChangeSet`] to them; deletes by
//! primary key are handled here.

pub mod payroll;
pub mod plans;
pub mod revenue;
pub mod subscriptions;
pub mod tenants;

use std::collections::BTreeSet;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgConnection;

use caboard_core::MandateId;

use crate::change::{Change, ChangeSet, Row, RowKey};
use crate::snapshot::Snapshot;

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if no URL is given (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Write a change set in one transaction.
pub async fn persist(pool: &PgPool, changes: &ChangeSet) -> Result<(), sqlx::Error> {
    if changes.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for change in changes.applied() {
        apply(&mut *tx, change).await?;
    }
    for mandate in touched_mandates(changes) {
        revenue::refresh_aggregates(&mut *tx, mandate).await?;
    }
    tx.commit().await
}

/// Mandates whose aggregates a change set may have moved. Every day-value
/// write also puts its mandate row, so deletes are covered too.
fn touched_mandates(changes: &ChangeSet) -> BTreeSet<MandateId> {
    changes
        .applied()
        .iter()
        .filter_map(|change| match change {
            Change::Put(Row::Mandate(m)) => Some(m.id),
            Change::Put(Row::DayValue(d)) => Some(d.mandate_id),
            _ => None,
        })
        .collect()
}

async fn apply(conn: &mut PgConnection, change: &Change) -> Result<(), sqlx::Error> {
    match change {
        Change::Put(row) => match row {
            Row::Plan(p) => plans::put(conn, p).await,
            Row::Organization(o) => tenants::put_organization(conn, o).await,
            Row::Member(m) => tenants::put_member(conn, m).await,
            Row::File(f) => tenants::put_file(conn, f).await,
            Row::Subscription(s) => subscriptions::put(conn, s).await,
            Row::Mandate(m) => revenue::put_mandate(conn, m).await,
            Row::DayValue(d) => revenue::put_day_value(conn, d).await,
            Row::ManualPayroll(e) => payroll::put_manual(conn, e).await,
            Row::PayrollImport(i) => payroll::put_import(conn, i).await,
            Row::Employee(e) => payroll::put_employee(conn, e).await,
        },
        Change::Delete(key) => delete(conn, *key).await,
    }
}

async fn delete(conn: &mut PgConnection, key: RowKey) -> Result<(), sqlx::Error> {
    let (sql, id) = match key {
        RowKey::Plan(id) => ("DELETE FROM plans WHERE id = $1", id.0),
        RowKey::Organization(id) => ("DELETE FROM organizations WHERE id = $1", id.0),
        RowKey::Member(id) => ("DELETE FROM organization_users WHERE user_id = $1", id.0),
        RowKey::Subscription(id) => ("DELETE FROM subscriptions WHERE id = $1", id.0),
        RowKey::Mandate(id) => ("DELETE FROM mandates WHERE id = $1", id.0),
        RowKey::DayValue(id) => ("DELETE FROM day_values WHERE id = $1", id.0),
        RowKey::File(id) => ("DELETE FROM stored_files WHERE id = $1", id.0),
        RowKey::Employee(id) => ("DELETE FROM employees WHERE id = $1", id.0),
        RowKey::ManualPayroll(mandate, period) => {
            return payroll::delete_manual(conn, mandate, period).await;
        }
        RowKey::PayrollImport(mandate, at) => {
            return payroll::delete_import(conn, mandate, at).await;
        }
    };
    sqlx::query(sql).bind(id).execute(conn).await?;
    Ok(())
}

/// Load every table into a snapshot.
pub async fn load_snapshot(pool: &PgPool) -> Result<Snapshot, sqlx::Error> {
    Ok(Snapshot {
        plans: plans::load_all(pool).await?,
        organizations: tenants::load_organizations(pool).await?,
        members: tenants::load_members(pool).await?,
        subscriptions: subscriptions::load_all(pool).await?,
        mandates: revenue::load_mandates(pool).await?,
        day_values: revenue::load_day_values(pool).await?,
        files: tenants::load_files(pool).await?,
        manual_payroll: payroll::load_manual(pool).await?,
        payroll_imports: payroll::load_imports(pool).await?,
        employees: payroll::load_employees(pool).await?,
    })
}

/// Counts and sizes are stored as BIGINT.
pub(crate) fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Wrap a domain parse failure on the read path.
pub(crate) fn decode_error<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}
