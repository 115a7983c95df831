//! Organizations, memberships and stored files.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use caboard_core::{FileId, OrganizationId, Timestamp, UserId};

use super::{decode_error, from_db, to_db};
use crate::records::{MemberRole, Organization, OrganizationUser, StoredFile};

pub async fn put_organization(conn: &mut PgConnection, org: &Organization) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO organizations (id, name, created_at) VALUES ($1, $2, $3)
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
    )
    .bind(org.id.0)
    .bind(&org.name)
    .bind(*org.created_at.as_datetime())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn put_member(conn: &mut PgConnection, member: &OrganizationUser) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO organization_users (user_id, organization_id, role, joined_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id) DO UPDATE SET
            organization_id = EXCLUDED.organization_id,
            role = EXCLUDED.role",
    )
    .bind(member.user_id.0)
    .bind(member.organization_id.0)
    .bind(member.role.as_str())
    .bind(*member.joined_at.as_datetime())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn put_file(conn: &mut PgConnection, file: &StoredFile) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO stored_files (id, organization_id, name, size_bytes, uploaded_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, size_bytes = EXCLUDED.size_bytes",
    )
    .bind(file.id.0)
    .bind(file.organization_id.0)
    .bind(&file.name)
    .bind(to_db(file.size_bytes))
    .bind(*file.uploaded_at.as_datetime())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn load_organizations(pool: &PgPool) -> Result<Vec<Organization>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrganizationRow>(
        "SELECT id, name, created_at FROM organizations ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| Organization {
            id: OrganizationId(r.id),
            name: r.name,
            created_at: Timestamp::from_utc(r.created_at),
        })
        .collect())
}

pub async fn load_members(pool: &PgPool) -> Result<Vec<OrganizationUser>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MemberRow>(
        "SELECT user_id, organization_id, role, joined_at FROM organization_users ORDER BY joined_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|r| {
            let role: MemberRole = r.role.parse().map_err(decode_error)?;
            Ok(OrganizationUser {
                user_id: UserId(r.user_id),
                organization_id: OrganizationId(r.organization_id),
                role,
                joined_at: Timestamp::from_utc(r.joined_at),
            })
        })
        .collect()
}

pub async fn load_files(pool: &PgPool) -> Result<Vec<StoredFile>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FileRow>(
        "SELECT id, organization_id, name, size_bytes, uploaded_at FROM stored_files ORDER BY uploaded_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| StoredFile {
            id: FileId(r.id),
            organization_id: OrganizationId(r.organization_id),
            name: r.name,
            size_bytes: from_db(r.size_bytes),
            uploaded_at: Timestamp::from_utc(r.uploaded_at),
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    user_id: Uuid,
    organization_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
}
