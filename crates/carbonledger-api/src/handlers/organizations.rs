use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use carbonledger_core::models::Organization;
use carbonledger_core::{AppError, Role};

use super::require_edit;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrganizationResponse {
    pub organization: Organization,
    /// True when the requested name collided and a suffixed slug was used.
    pub slug_adjusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// List the caller's organizations with their role in each. An empty list is
/// a normal state for a new user and routes them to onboarding.
#[utoipa::path(
    get,
    path = "/api/organizations",
    responses(
        (status = 200, description = "Organizations the caller belongs to"),
        (status = 401, description = "Missing or invalid session")
    ),
    tag = "organizations"
)]
#[tracing::instrument(skip(state))]
pub async fn list_organizations(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let organizations = state
        .services
        .membership
        .list_organizations_for_user(user.user_id)
        .await?;

    let onboarding = organizations.is_empty();
    Ok(Json(serde_json::json!({
        "organizations": organizations,
        "count": organizations.len(),
        "onboarding": onboarding,
    })))
}

/// Create an organization owned by the caller.
#[utoipa::path(
    post,
    path = "/api/organizations",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = CreateOrganizationResponse),
        (status = 400, description = "Invalid name")
    ),
    tag = "organizations"
)]
#[tracing::instrument(skip(state, body))]
pub async fn create_organization(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<CreateOrganizationResponse>), HttpAppError> {
    let created = state
        .services
        .membership
        .create_organization(&body.name, user.user_id)
        .await?;

    let message = created.slug_adjusted.then(|| {
        format!(
            "The name was already taken; your organization is available at '{}'",
            created.organization.slug
        )
    });

    Ok((
        StatusCode::CREATED,
        Json(CreateOrganizationResponse {
            organization: created.organization,
            slug_adjusted: created.slug_adjusted,
            message,
        }),
    ))
}

/// Fetch one organization the caller belongs to.
#[tracing::instrument(skip(state))]
pub async fn get_organization(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let role = state
        .services
        .membership
        .member_role(organization_id, user.user_id)
        .await?;

    let organization = state
        .db
        .organization_repository
        .get(organization_id)
        .await?
        .ok_or_else(|| AppError::OrganizationNotFound(organization_id.to_string()))?;

    let trial_expired = organization.trial_expired(Utc::now());
    Ok(Json(serde_json::json!({
        "organization": organization,
        "role": role,
        "trial_expired": trial_expired,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrganizationRequest {
    pub name: String,
}

/// Rename an organization. Owners and admins only.
#[tracing::instrument(skip(state, body))]
pub async fn update_organization(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateOrganizationRequest>,
) -> Result<Json<Organization>, HttpAppError> {
    let role = state
        .services
        .membership
        .member_role(organization_id, user.user_id)
        .await?;
    require_edit(role)?;

    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Organization name must not be empty".to_string()).into());
    }

    let organization = state
        .db
        .organization_repository
        .update_name(organization_id, body.name.trim())
        .await?;

    Ok(Json(organization))
}

/// Delete an organization and everything it owns. Owners only.
#[tracing::instrument(skip(state))]
pub async fn delete_organization(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let role = state
        .services
        .membership
        .member_role(organization_id, user.user_id)
        .await?;
    if role != Role::Owner {
        return Err(
            AppError::Forbidden("Only the owner may delete an organization".to_string()).into(),
        );
    }

    state
        .db
        .organization_repository
        .delete(organization_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
