use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "incident_severity", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Incident lifecycle state. Transitions only move forward along
/// `open -> in_progress -> resolved -> closed`; `closed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "incident_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(self, next: IncidentStatus) -> bool {
        use IncidentStatus::*;
        match (self, next) {
            (Open, InProgress) => true,
            (Open | InProgress, Resolved) => true,
            (Open | InProgress | Resolved, Closed) => true,
            _ => false,
        }
    }

    /// Validate a transition, returning the audit-log action name recorded
    /// alongside it.
    pub fn transition(self, next: IncidentStatus) -> Result<&'static str, AppError> {
        if !self.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        Ok(match next {
            IncidentStatus::Open => "opened",
            IncidentStatus::InProgress => "started",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        })
    }
}

/// Organization-defined incident classification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct IncidentType {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incident entity. `resolved_at` and `closed_at`, once set, are never
/// cleared; `closed_at` is non-null iff status = closed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Incident {
    pub id: Uuid,
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub incident_type_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub location: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only comment on an incident, ordered by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct IncidentComment {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit record; one is written for every status transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct IncidentAuditLog {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub action: String,
    pub performed_by: Uuid,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// AI-produced prediction attached to an incident, append-only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct IncidentPrediction {
    pub id: Uuid,
    pub incident_id: Uuid,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub prediction: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use IncidentStatus::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(Open.can_transition_to(InProgress));
        assert!(Open.can_transition_to(Resolved));
        assert!(Open.can_transition_to(Closed));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(InProgress.can_transition_to(Closed));
        assert!(Resolved.can_transition_to(Closed));
    }

    #[test]
    fn test_closed_is_terminal() {
        for next in [Open, InProgress, Resolved, Closed] {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!InProgress.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(!Open.can_transition_to(Open));
    }

    #[test]
    fn test_transition_returns_audit_action() {
        assert_eq!(Open.transition(Resolved).unwrap(), "resolved");
        assert_eq!(Resolved.transition(Closed).unwrap(), "closed");
        let err = Closed.transition(Open).unwrap_err();
        match err {
            AppError::InvalidStatusTransition { from, to } => {
                assert_eq!(from, "closed");
                assert_eq!(to, "open");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
