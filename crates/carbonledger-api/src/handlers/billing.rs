use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::HttpAppError;
use crate::state::AppState;
use carbonledger_core::AppError;

use super::caller_scope;

/// The organization's subscription, read-only. Payment processing is mocked;
/// the row is created with the organization.
#[tracing::instrument(skip(state))]
pub async fn get_subscription(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    caller_scope(&state.db, organization_id, user.user_id).await?;

    let subscription = state
        .db
        .subscription_repository
        .get_for_organization(organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

    Ok(Json(serde_json::json!({ "subscription": subscription })))
}
