//! Mandates and their daily revenue rows.
//!
//! `total_revenue` and `last_entry` are cached aggregates. They are
//! recomputed from `day_values` by [`refresh_aggregates`] in the same
//! transaction as the day-value change that moved them, so the stored row
//! never depends on which in-memory image was written last.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use caboard_core::{Cents, DayValueId, MandateId, OrganizationId, Timestamp};

use crate::records::{DayValue, Mandate};

pub async fn put_mandate(conn: &mut PgConnection, mandate: &Mandate) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO mandates (id, organization_id, name, total_revenue, last_entry, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            total_revenue = EXCLUDED.total_revenue,
            last_entry = EXCLUDED.last_entry",
    )
    .bind(mandate.id.0)
    .bind(mandate.organization_id.0)
    .bind(&mandate.name)
    .bind(mandate.total_revenue.get())
    .bind(mandate.last_entry)
    .bind(*mandate.created_at.as_datetime())
    .execute(conn)
    .await?;
    Ok(())
}

/// Recompute a mandate's cached aggregates from its stored day values.
pub async fn refresh_aggregates(conn: &mut PgConnection, mandate: MandateId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE mandates SET
            total_revenue = (SELECT COALESCE(SUM(value), 0)::BIGINT FROM day_values WHERE mandate_id = $1),
            last_entry = (SELECT MAX(date) FROM day_values WHERE mandate_id = $1)
         WHERE id = $1",
    )
    .bind(mandate.0)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn put_day_value(conn: &mut PgConnection, day: &DayValue) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO day_values (id, mandate_id, date, value) VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(day.id.0)
    .bind(day.mandate_id.0)
    .bind(day.date)
    .bind(day.value.get())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn load_mandates(pool: &PgPool) -> Result<Vec<Mandate>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MandateRow>(
        "SELECT id, organization_id, name, total_revenue, last_entry, created_at
         FROM mandates ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(MandateRow::into_record).collect())
}

pub async fn load_day_values(pool: &PgPool) -> Result<Vec<DayValue>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DayValueRow>(
        "SELECT id, mandate_id, date, value FROM day_values ORDER BY mandate_id, date",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| DayValue {
            id: DayValueId(r.id),
            mandate_id: MandateId(r.mandate_id),
            date: r.date,
            value: Cents(r.value),
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct MandateRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    total_revenue: i64,
    last_entry: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl MandateRow {
    fn into_record(self) -> Mandate {
        Mandate {
            id: MandateId(self.id),
            organization_id: OrganizationId(self.organization_id),
            name: self.name,
            total_revenue: Cents(self.total_revenue),
            last_entry: self.last_entry,
            created_at: Timestamp::from_utc(self.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct DayValueRow {
    id: Uuid,
    mandate_id: Uuid,
    date: NaiveDate,
    value: i64,
}
