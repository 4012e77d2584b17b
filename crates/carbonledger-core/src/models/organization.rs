use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::access::Role;

/// Organization entity. The top-level tenant boundary: every project,
/// material, incident, and membership belongs to exactly one organization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Unique across all organizations.
    pub slug: String,
    pub is_demo: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Whether the demo trial window has passed. Informational only; no
    /// feature is gated on it.
    pub fn trial_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_demo
            && self
                .trial_ends_at
                .map(|ends| ends < now)
                .unwrap_or(false)
    }
}

/// Organization membership row. At most one per (organization, user).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrganizationMember {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An organization joined with the caller's role in it, as returned by the
/// membership listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrganizationWithRole {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_demo: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Time-limited, single-use invite code granting organization membership.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrganizationInvite {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Short uppercase alphanumeric code.
    pub code: String,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationInvite {
    /// Invites past `expires_at` are invalid even if not yet deleted.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invite(expires_at: DateTime<Utc>) -> OrganizationInvite {
        OrganizationInvite {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            code: "AB12CD34".to_string(),
            created_by: Uuid::new_v4(),
            expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_invite_expiry() {
        let now = Utc::now();
        assert!(invite(now - Duration::seconds(1)).is_expired(now));
        assert!(!invite(now + Duration::days(7)).is_expired(now));
    }

    #[test]
    fn test_trial_expired_only_for_demo_orgs() {
        let now = Utc::now();
        let mut org = Organization {
            id: Uuid::new_v4(),
            name: "Acme Corp".to_string(),
            slug: "acme-corp".to_string(),
            is_demo: true,
            trial_ends_at: Some(now - Duration::days(1)),
            created_at: now,
            updated_at: now,
        };
        assert!(org.trial_expired(now));
        org.is_demo = false;
        assert!(!org.trial_expired(now));
    }
}
