use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Issue an invite code for an organization. Owners and admins only.
#[utoipa::path(
    post,
    path = "/api/organizations/{organization_id}/invites",
    responses(
        (status = 201, description = "Invite code generated"),
        (status = 403, description = "Caller may not manage invites"),
        (status = 404, description = "Not a member of this organization")
    ),
    tag = "invites"
)]
#[tracing::instrument(skip(state))]
pub async fn create_invite(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
) -> Result<(StatusCode, Json<serde_json::Value>), HttpAppError> {
    let invite = state
        .services
        .membership
        .generate_invite(organization_id, user.user_id, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "invite": invite,
        })),
    ))
}

/// Unexpired invites for an organization. Owners and admins only.
#[tracing::instrument(skip(state))]
pub async fn list_invites(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let invites = state
        .services
        .membership
        .list_active_invites(organization_id, user.user_id, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "invites": invites,
        "count": invites.len(),
    })))
}

/// Revoke an invite before it is redeemed. Owners and admins only.
#[tracing::instrument(skip(state))]
pub async fn delete_invite(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let role = state
        .services
        .membership
        .member_role(organization_id, user.user_id)
        .await?;
    if !role.can_manage_members() {
        return Err(carbonledger_core::AppError::Forbidden(
            "Only owners and admins may manage invites".to_string(),
        )
        .into());
    }

    state
        .db
        .invite_repository
        .delete(organization_id, invite_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemInviteRequest {
    pub code: String,
}

/// Redeem an invite code, joining its organization as a member. The code is
/// single-use and invalid once expired.
#[utoipa::path(
    post,
    path = "/api/invites/redeem",
    request_body = RedeemInviteRequest,
    responses(
        (status = 200, description = "Joined the organization"),
        (status = 400, description = "Invalid or expired invite code"),
        (status = 409, description = "Already a member")
    ),
    tag = "invites"
)]
#[tracing::instrument(skip(state, body))]
pub async fn redeem_invite(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RedeemInviteRequest>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let member = state
        .services
        .membership
        .redeem_invite(&body.code, user.user_id, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "membership": member,
    })))
}
