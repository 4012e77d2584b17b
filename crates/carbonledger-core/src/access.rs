//! Access-scoping rules.
//!
//! A user's authority over an entity is derived from the nearest enclosing
//! organization or project membership, never stored on the entity itself.
//! These rules are pure; repositories apply them as SQL filters and handlers
//! apply them to gate mutations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Membership role, shared by organization and project memberships.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "member_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    /// Mutation gate used uniformly across organizations and projects.
    pub fn can_edit(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Whether this role may manage memberships and invites.
    pub fn can_manage_members(self) -> bool {
        self.can_edit()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(crate::AppError::InvalidInput(format!(
                "Unknown role '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of projects a caller may see.
///
/// Organization-wide admins and owners see everything; everyone else is
/// restricted to the projects they are explicitly a member of. A scoped miss
/// is reported as "not found", never "forbidden".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    /// No filter - organization-wide visibility.
    All,
    /// Restricted to this explicit membership set.
    Members(Vec<Uuid>),
}

impl ProjectScope {
    /// Build the scope for a caller with the given organization role and
    /// explicit project memberships.
    pub fn for_user(org_role: Role, accessible_project_ids: Vec<Uuid>) -> Self {
        if org_role.can_edit() {
            ProjectScope::All
        } else {
            ProjectScope::Members(accessible_project_ids)
        }
    }

    /// Whether a single project is visible under this scope.
    pub fn allows(&self, project_id: Uuid) -> bool {
        match self {
            ProjectScope::All => true,
            ProjectScope::Members(ids) => ids.contains(&project_id),
        }
    }

    /// The explicit id list, or None when unrestricted. Repositories bind
    /// this as an `= ANY($n)` filter.
    pub fn as_filter(&self) -> Option<&[Uuid]> {
        match self {
            ProjectScope::All => None,
            ProjectScope::Members(ids) => Some(ids),
        }
    }

    /// An empty membership set is a valid state (new user), not an error.
    pub fn is_empty(&self) -> bool {
        matches!(self, ProjectScope::Members(ids) if ids.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_edit_matrix() {
        assert!(Role::Owner.can_edit());
        assert!(Role::Admin.can_edit());
        assert!(!Role::Member.can_edit());
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in [Role::Owner, Role::Admin, Role::Member] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("viewer".parse::<Role>().is_err());
    }

    #[test]
    fn test_admin_scope_is_unrestricted() {
        let scope = ProjectScope::for_user(Role::Admin, vec![]);
        assert_eq!(scope, ProjectScope::All);
        assert!(scope.allows(Uuid::new_v4()));
        assert!(scope.as_filter().is_none());
    }

    #[test]
    fn test_member_scope_restricts_to_membership_set() {
        let visible = Uuid::new_v4();
        let hidden = Uuid::new_v4();
        let scope = ProjectScope::for_user(Role::Member, vec![visible]);
        assert!(scope.allows(visible));
        assert!(!scope.allows(hidden));
        assert_eq!(scope.as_filter(), Some(&[visible][..]));
    }

    #[test]
    fn test_empty_membership_is_valid_not_an_error() {
        let scope = ProjectScope::for_user(Role::Member, vec![]);
        assert!(scope.is_empty());
        assert!(!scope.allows(Uuid::new_v4()));
    }
}
