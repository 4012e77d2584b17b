use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::access::Role;

/// Distinguishes plain projects from business units. A business unit is a
/// grouping node; a project may name one as its parent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "project_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    BusinessUnit,
    Project,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "project_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Inactive,
    Draft,
}

/// Scope 1/2/3 totals and period deltas, stored as a JSON column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct EmissionsData {
    pub scope1_total: Decimal,
    pub scope2_total: Decimal,
    pub scope3_total: Decimal,
    pub scope1_delta: Decimal,
    pub scope2_delta: Decimal,
    pub scope3_delta: Decimal,
}

impl EmissionsData {
    pub fn total(&self) -> Decimal {
        self.scope1_total + self.scope2_total + self.scope3_total
    }
}

/// Project entity; also represents a business unit via `project_type`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Project {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub project_type: ProjectType,
    pub code: Option<String>,
    pub status: ProjectStatus,
    pub location: Option<String>,
    /// If set, must reference a row with `project_type = business_unit`.
    pub parent_id: Option<Uuid>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub emissions_data: EmissionsData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

/// Project membership row. At most one per (project, user).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Email- and role-targeted invite scoped to a project, with the same expiry
/// semantics as organization invites.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProjectInvite {
    pub id: Uuid,
    pub project_id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectInvite {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_emissions_total_sums_scopes() {
        let data = EmissionsData {
            scope1_total: dec("10.5"),
            scope2_total: dec("4.5"),
            scope3_total: dec("85.0"),
            ..Default::default()
        };
        assert_eq!(data.total(), dec("100.0"));
    }
}
