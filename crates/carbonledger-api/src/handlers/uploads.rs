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
use carbonledger_core::models::{Upload, UploadStatus};
use carbonledger_core::AppError;

use super::caller_scope;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUploadRequest {
    pub name: String,
    pub size: i64,
}

/// Record an upload against a project; it starts in `processing` until the
/// analysis endpoint reports an outcome.
#[tracing::instrument(skip(state, body))]
pub async fn create_upload(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<CreateUploadRequest>,
) -> Result<(StatusCode, Json<Upload>), HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }
    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Upload name must not be empty".to_string()).into());
    }
    if body.size < 0 {
        return Err(AppError::InvalidInput("Upload size must not be negative".to_string()).into());
    }

    let upload = state
        .db
        .upload_repository
        .create(project_id, body.name.trim(), body.size, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(upload)))
}

#[tracing::instrument(skip(state))]
pub async fn list_uploads(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }

    let uploads = state
        .db
        .upload_repository
        .list_for_project(project_id)
        .await?;

    Ok(Json(serde_json::json!({
        "uploads": uploads,
        "count": uploads.len(),
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUploadStatusRequest {
    pub status: UploadStatus,
}

/// Mark an upload completed or failed after analysis.
#[tracing::instrument(skip(state, body))]
pub async fn update_upload_status(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id, upload_id)): Path<(Uuid, Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<UpdateUploadStatusRequest>,
) -> Result<Json<Upload>, HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }

    let upload = state
        .db
        .upload_repository
        .update_status(project_id, upload_id, body.status)
        .await?;

    Ok(Json(upload))
}
