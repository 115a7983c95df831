//! Subscription persistence.
//!
//! The lifecycle is enforced in `caboard-state`, not in SQL. The status
//! column stores the SCREAMING_SNAKE_CASE name; the transition log is JSONB.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use caboard_core::{OrganizationId, PlanId, SubscriptionId, Timestamp};
use caboard_state::{Subscription, SubscriptionStatus, SubscriptionTransitionRecord};

use super::decode_error;

pub async fn put(conn: &mut PgConnection, sub: &Subscription) -> Result<(), sqlx::Error> {
    let transitions = serde_json::to_value(&sub.transitions).map_err(|e| {
        tracing::error!(subscription = %sub.id, error = %e, "failed to serialize transition log");
        sqlx::Error::Encode(Box::new(e))
    })?;
    sqlx::query(
        "INSERT INTO subscriptions (id, organization_id, plan_id, status, current_period_start,
                                    current_period_end, created_at, transitions)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (id) DO UPDATE SET
            status = EXCLUDED.status,
            current_period_start = EXCLUDED.current_period_start,
            current_period_end = EXCLUDED.current_period_end,
            transitions = EXCLUDED.transitions",
    )
    .bind(sub.id.0)
    .bind(sub.organization_id.0)
    .bind(sub.plan_id.0)
    .bind(sub.status.as_str())
    .bind(*sub.current_period_start.as_datetime())
    .bind(sub.current_period_end.map(|t| *t.as_datetime()))
    .bind(*sub.created_at.as_datetime())
    .bind(transitions)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<Subscription>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT id, organization_id, plan_id, status, current_period_start, current_period_end,
                created_at, transitions
         FROM subscriptions ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SubscriptionRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    organization_id: Uuid,
    plan_id: Uuid,
    status: String,
    current_period_start: DateTime<Utc>,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    transitions: serde_json::Value,
}

impl SubscriptionRow {
    fn into_record(self) -> Result<Subscription, sqlx::Error> {
        let status: SubscriptionStatus = self.status.parse().map_err(decode_error)?;
        let transitions: Vec<SubscriptionTransitionRecord> =
            serde_json::from_value(self.transitions).map_err(decode_error)?;
        Ok(Subscription {
            id: SubscriptionId(self.id),
            organization_id: OrganizationId(self.organization_id),
            plan_id: PlanId(self.plan_id),
            status,
            current_period_start: Timestamp::from_utc(self.current_period_start),
            current_period_end: self.current_period_end.map(Timestamp::from_utc),
            created_at: Timestamp::from_utc(self.created_at),
            transitions,
        })
    }
}
