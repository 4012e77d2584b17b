use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use carbonledger_core::models::OrganizationMember;
use carbonledger_core::{AppError, Role};

/// List an organization's members. Any member may look.
#[tracing::instrument(skip(state))]
pub async fn list_members(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    state
        .services
        .membership
        .member_role(organization_id, user.user_id)
        .await?;

    let members = state.db.member_repository.list(organization_id).await?;
    Ok(Json(serde_json::json!({
        "members": members,
        "count": members.len(),
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberRoleRequest {
    pub role: Role,
}

/// Change a member's role. Owners and admins only.
#[tracing::instrument(skip(state, body))]
pub async fn update_member_role(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, member_user_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<UpdateMemberRoleRequest>,
) -> Result<Json<OrganizationMember>, HttpAppError> {
    let caller_role = state
        .services
        .membership
        .member_role(organization_id, user.user_id)
        .await?;
    if !caller_role.can_manage_members() {
        return Err(
            AppError::Forbidden("Only owners and admins may change roles".to_string()).into(),
        );
    }

    let member = state
        .db
        .member_repository
        .update_role(organization_id, member_user_id, body.role)
        .await?;

    Ok(Json(member))
}

/// Remove a member. Owners and admins may remove anyone; a member may
/// always remove themselves (leave).
#[tracing::instrument(skip(state))]
pub async fn remove_member(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, member_user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let caller_role = state
        .services
        .membership
        .member_role(organization_id, user.user_id)
        .await?;

    let leaving = member_user_id == user.user_id;
    if !leaving && !caller_role.can_manage_members() {
        return Err(
            AppError::Forbidden("Only owners and admins may remove members".to_string()).into(),
        );
    }

    state
        .db
        .member_repository
        .remove(organization_id, member_user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
