use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use carbonledger_core::models::{
    EmissionsData, Project, ProjectMember, ProjectStatus, ProjectType,
};
use carbonledger_core::{AppError, Role};
use carbonledger_db::db::project::NewProject;

use super::{caller_scope, can_edit_project, require_edit};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub code: Option<String>,
    pub status: Option<ProjectStatus>,
    pub location: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl ProjectRequest {
    fn into_new_project(self) -> Result<NewProject, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Project name must not be empty".to_string(),
            ));
        }
        Ok(NewProject {
            name: self.name.trim().to_string(),
            description: self.description,
            project_type: self.project_type,
            code: self.code,
            status: self.status.unwrap_or(ProjectStatus::Draft),
            location: self.location,
            parent_id: self.parent_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    /// Filter by type: "project" or "business_unit".
    #[serde(rename = "type")]
    pub project_type: Option<ProjectType>,
}

/// List projects and business units visible to the caller.
#[tracing::instrument(skip(state))]
pub async fn list_projects(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;

    let projects = state
        .db
        .project_repository
        .list(organization_id, &scope, query.project_type)
        .await?;

    Ok(Json(serde_json::json!({
        "projects": projects,
        "count": projects.len(),
    })))
}

/// Create a project or business unit. Owners and admins only.
#[tracing::instrument(skip(state, body))]
pub async fn create_project(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<ProjectRequest>,
) -> Result<(StatusCode, Json<Project>), HttpAppError> {
    let (role, _) = caller_scope(&state.db, organization_id, user.user_id).await?;
    require_edit(role)?;

    let new = body.into_new_project()?;
    let project = state
        .db
        .project_repository
        .create(organization_id, new, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// Fetch one project. Outside the caller's scope it reads as absent.
#[tracing::instrument(skip(state))]
pub async fn get_project(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Project>, HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;

    let project = state
        .db
        .project_repository
        .get(organization_id, project_id, &scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// Update a project. Requires edit rights on the organization or the project.
#[tracing::instrument(skip(state, body))]
pub async fn update_project(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<ProjectRequest>,
) -> Result<Json<Project>, HttpAppError> {
    let (role, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }
    if !can_edit_project(&state.db, role, project_id, user.user_id).await? {
        return Err(
            AppError::Forbidden("You do not have edit rights on this project".to_string()).into(),
        );
    }

    let new = body.into_new_project()?;
    let project = state
        .db
        .project_repository
        .update(organization_id, project_id, new, user.user_id)
        .await?;

    Ok(Json(project))
}

/// Replace a project's scope 1/2/3 totals and deltas.
#[tracing::instrument(skip(state, body))]
pub async fn update_project_emissions(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<EmissionsData>,
) -> Result<Json<Project>, HttpAppError> {
    let (role, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }
    if !can_edit_project(&state.db, role, project_id, user.user_id).await? {
        return Err(
            AppError::Forbidden("You do not have edit rights on this project".to_string()).into(),
        );
    }

    let project = state
        .db
        .project_repository
        .update_emissions(organization_id, project_id, &body, user.user_id)
        .await?;

    Ok(Json(project))
}

/// Delete a project. Owners and admins only; children cascade.
#[tracing::instrument(skip(state))]
pub async fn delete_project(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let (role, _) = caller_scope(&state.db, organization_id, user.user_id).await?;
    require_edit(role)?;

    state
        .db
        .project_repository
        .delete(organization_id, project_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddProjectMemberRequest {
    pub user_id: Uuid,
    pub role: Role,
}

/// Add a member to a project.
#[tracing::instrument(skip(state, body))]
pub async fn add_project_member(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<AddProjectMemberRequest>,
) -> Result<(StatusCode, Json<ProjectMember>), HttpAppError> {
    let (role, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }
    if !can_edit_project(&state.db, role, project_id, user.user_id).await? {
        return Err(
            AppError::Forbidden("You do not have edit rights on this project".to_string()).into(),
        );
    }

    let member = state
        .db
        .project_repository
        .add_member(project_id, body.user_id, body.role)
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// List a project's members.
#[tracing::instrument(skip(state))]
pub async fn list_project_members(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }

    let members = state.db.project_repository.list_members(project_id).await?;
    Ok(Json(serde_json::json!({
        "members": members,
        "count": members.len(),
    })))
}

/// Remove a project member.
#[tracing::instrument(skip(state))]
pub async fn remove_project_member(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id, member_user_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let (role, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }
    let leaving = member_user_id == user.user_id;
    if !leaving && !can_edit_project(&state.db, role, project_id, user.user_id).await? {
        return Err(
            AppError::Forbidden("You do not have edit rights on this project".to_string()).into(),
        );
    }

    state
        .db
        .project_repository
        .remove_member(project_id, member_user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Unexpired email invitations for a project or business unit.
#[tracing::instrument(skip(state))]
pub async fn list_project_invites(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let (role, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }
    if !can_edit_project(&state.db, role, project_id, user.user_id).await? {
        return Err(
            AppError::Forbidden("You do not have edit rights on this project".to_string()).into(),
        );
    }

    let invites = state
        .db
        .project_repository
        .list_invites(project_id, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "invites": invites,
        "count": invites.len(),
    })))
}

// ----- /api/invite-user -----

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserRequest {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub business_unit_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserResponse {
    pub success: bool,
    pub message: String,
    pub invitation_id: Uuid,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Invite a user to a business unit by email. Dispatch is simulated: the
/// invitation row is persisted and the send is logged, no mail goes out.
#[utoipa::path(
    post,
    path = "/api/invite-user",
    request_body = InviteUserRequest,
    responses(
        (status = 200, description = "Invitation recorded", body = InviteUserResponse),
        (status = 400, description = "Missing email, role, or businessUnitId")
    ),
    tag = "invites"
)]
#[tracing::instrument(skip(state, body))]
pub async fn invite_user(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<InviteUserRequest>,
) -> Result<Json<InviteUserResponse>, HttpAppError> {
    let (Some(email), Some(role), Some(business_unit_id)) =
        (body.email, body.role, body.business_unit_id)
    else {
        return Err(AppError::InvalidInput(
            "email, role, and businessUnitId are required".to_string(),
        )
        .into());
    };
    if !email.contains('@') {
        return Err(AppError::InvalidInput("email is not valid".to_string()).into());
    }

    // The business unit must be visible to the caller, and inviting requires
    // edit rights on it.
    let organization_id = state
        .db
        .project_repository
        .organization_of(business_unit_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business unit not found".to_string()))?;
    let (role, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(business_unit_id) {
        return Err(AppError::NotFound("Business unit not found".to_string()).into());
    }
    if !can_edit_project(&state.db, role, business_unit_id, user.user_id).await? {
        return Err(
            AppError::Forbidden("You do not have edit rights on this business unit".to_string())
                .into(),
        );
    }

    let expires_at = Utc::now() + Duration::days(state.config.invite_expiry_days);
    let invite = state
        .db
        .project_repository
        .create_invite(business_unit_id, &email, role, user.user_id, expires_at)
        .await?;

    // Simulated dispatch: log instead of sending mail.
    tracing::info!(
        invitation_id = %invite.id,
        email = %email,
        business_unit_id = %business_unit_id,
        "Invitation email dispatch simulated"
    );

    Ok(Json(InviteUserResponse {
        success: true,
        message: format!("Invitation sent to {}", email),
        invitation_id: invite.id,
        expires_at: invite.expires_at,
    }))
}
