use axum::{extract::State, response::Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::DbState;
use carbonledger_core::models::Profile;
use carbonledger_core::AppError;

/// The caller's profile.
#[tracing::instrument(skip(db))]
pub async fn get_profile(
    user: SessionUser,
    State(db): State<DbState>,
) -> Result<Json<Profile>, HttpAppError> {
    let profile = db
        .profile_repository
        .get(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub job_title: Option<String>,
    #[serde(default = "default_notifications")]
    pub email_notifications: bool,
}

fn default_notifications() -> bool {
    true
}

#[tracing::instrument(skip(db, body))]
pub async fn update_profile(
    user: SessionUser,
    State(db): State<DbState>,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<Profile>, HttpAppError> {
    let profile = db
        .profile_repository
        .update(
            user.user_id,
            body.display_name.as_deref(),
            body.job_title.as_deref(),
            body.email_notifications,
        )
        .await?;

    Ok(Json(profile))
}
