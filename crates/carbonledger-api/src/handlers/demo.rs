use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::issue_session_token;
use crate::error::HttpAppError;
use crate::state::AppState;
use carbonledger_core::AppError;

/// Development-only bootstrap: creates a demo user, profile, organization,
/// and owner membership, and returns a ready session token. 403 outside
/// development.
#[utoipa::path(
    post,
    path = "/api/setup-demo",
    responses(
        (status = 201, description = "Demo environment created"),
        (status = 403, description = "Not available outside development")
    ),
    tag = "development"
)]
#[tracing::instrument(skip(state))]
pub async fn setup_demo(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<serde_json::Value>), HttpAppError> {
    if !state.config.is_development() {
        return Err(AppError::Forbidden(
            "Demo setup is only available in development".to_string(),
        )
        .into());
    }

    let user_id = Uuid::new_v4();
    let email = format!("demo-{}@example.com", &user_id.simple().to_string()[..8]);

    let profile = state.db.profile_repository.ensure(user_id, &email).await?;

    let created = state
        .services
        .membership
        .create_demo_organization("Demo Organization", user_id, Utc::now())
        .await?;

    let token = issue_session_token(
        &state.config.jwt_secret,
        user_id,
        &email,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(
        user_id = %user_id,
        organization_id = %created.organization.id,
        "Demo environment created"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "user_id": user_id,
            "email": profile.email,
            "organization": created.organization,
            "token": token,
        })),
    ))
}
