//! Plan catalog persistence.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use caboard_core::{PlanId, PlanTier};
use caboard_entitlements::Plan;

use super::{decode_error, from_db, to_db};

pub async fn put(conn: &mut PgConnection, plan: &Plan) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO plans (id, tier, name, max_users, max_mandates, max_storage_mb,
                            has_advanced_reports, has_api_access, has_custom_branding, active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (id) DO UPDATE SET
            tier = EXCLUDED.tier,
            name = EXCLUDED.name,
            max_users = EXCLUDED.max_users,
            max_mandates = EXCLUDED.max_mandates,
            max_storage_mb = EXCLUDED.max_storage_mb,
            has_advanced_reports = EXCLUDED.has_advanced_reports,
            has_api_access = EXCLUDED.has_api_access,
            has_custom_branding = EXCLUDED.has_custom_branding,
            active = EXCLUDED.active",
    )
    .bind(plan.id.0)
    .bind(plan.tier.as_str())
    .bind(&plan.name)
    .bind(plan.max_users.map(to_db))
    .bind(plan.max_mandates.map(to_db))
    .bind(plan.max_storage_mb.map(to_db))
    .bind(plan.has_advanced_reports)
    .bind(plan.has_api_access)
    .bind(plan.has_custom_branding)
    .bind(plan.active)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<Plan>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PlanRow>(
        "SELECT id, tier, name, max_users, max_mandates, max_storage_mb,
                has_advanced_reports, has_api_access, has_custom_branding, active
         FROM plans ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(PlanRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    tier: String,
    name: String,
    max_users: Option<i64>,
    max_mandates: Option<i64>,
    max_storage_mb: Option<i64>,
    has_advanced_reports: bool,
    has_api_access: bool,
    has_custom_branding: bool,
    active: bool,
}

impl PlanRow {
    fn into_record(self) -> Result<Plan, sqlx::Error> {
        let tier: PlanTier = self.tier.parse().map_err(decode_error)?;
        Ok(Plan {
            id: PlanId(self.id),
            tier,
            name: self.name,
            max_users: self.max_users.map(from_db),
            max_mandates: self.max_mandates.map(from_db),
            max_storage_mb: self.max_storage_mb.map(from_db),
            has_advanced_reports: self.has_advanced_reports,
            has_api_access: self.has_api_access,
            has_custom_branding: self.has_custom_branding,
            active: self.active,
        })
    }
}
