//! Tenant-owned rows.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use caboard_core::{
    Cents, DayValueId, FileId, MandateId, OrganizationId, Timestamp, UserId, ValidationError,
};

/// A tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub created_at: Timestamp,
}

/// Role of a member inside its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Self::Owner),
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            other => Err(ValidationError::Invalid(format!("unknown member role {other:?}"))),
        }
    }
}

/// Membership of a user in an organization. A user has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationUser {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: MemberRole,
    pub joined_at: Timestamp,
}

/// An establishment whose daily revenue is tracked.
///
/// `total_revenue` and `last_entry` cache `sum(value)` and `max(date)` over
/// the mandate's day values. Only the revenue writer in `revenue.rs`
/// assigns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mandate {
    pub id: MandateId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub total_revenue: Cents,
    pub last_entry: Option<NaiveDate>,
    pub created_at: Timestamp,
}

/// Revenue of one mandate on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayValue {
    pub id: DayValueId,
    pub mandate_id: MandateId,
    pub date: NaiveDate,
    pub value: Cents,
}

/// A file counted against the organization's storage limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: FileId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub size_bytes: u64,
    pub uploaded_at: Timestamp,
}
