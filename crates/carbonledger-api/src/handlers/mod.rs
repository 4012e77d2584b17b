//! HTTP handlers, one module per aggregate.

pub mod ai;
pub mod auth_callback;
pub mod billing;
pub mod chat;
pub mod demo;
pub mod incidents;
pub mod invites;
pub mod materials;
pub mod members;
pub mod organizations;
pub mod profile;
pub mod projects;
pub mod uploads;

use carbonledger_core::{AppError, ProjectScope, Role};
use uuid::Uuid;

use crate::state::DbState;

/// Resolve the caller's role and project scope within an organization.
/// A caller who is not a member gets NotFound, never Forbidden: outside the
/// scope, the organization does not exist.
pub(crate) async fn caller_scope(
    db: &DbState,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<(Role, ProjectScope), AppError> {
    let role = db
        .organization_repository
        .member_role(organization_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let scope = if role.can_edit() {
        ProjectScope::All
    } else {
        let ids = db
            .project_repository
            .member_project_ids(organization_id, user_id)
            .await?;
        ProjectScope::Members(ids)
    };

    Ok((role, scope))
}

/// Gate a mutation on the caller's organization role.
pub(crate) fn require_edit(role: Role) -> Result<(), AppError> {
    if !role.can_edit() {
        return Err(AppError::Forbidden(
            "Only owners and admins may perform this action".to_string(),
        ));
    }
    Ok(())
}

/// Whether the caller may mutate a specific project: organization-wide edit
/// rights, or an owner/admin membership on the project itself.
pub(crate) async fn can_edit_project(
    db: &DbState,
    org_role: Role,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<bool, AppError> {
    if org_role.can_edit() {
        return Ok(true);
    }
    let members = db.project_repository.list_members(project_id).await?;
    Ok(members
        .iter()
        .any(|m| m.user_id == user_id && m.role.can_edit()))
}
