use axum::{extract::State, response::Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::ServiceState;
use carbonledger_core::{AppError, Role};
use carbonledger_services::ChatContext;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    /// Role the dashboard is rendering for; scoping stays bounded by the
    /// session user's actual memberships regardless.
    pub user_role: Option<Role>,
    pub user_projects: Option<Vec<Uuid>>,
}

/// Answer a dashboard chat message from role/project-scoped data. The user
/// identity always comes from the session, never the body.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chat response"),
        (status = 400, description = "Missing message")
    ),
    tag = "ai"
)]
#[tracing::instrument(skip(services, body))]
pub async fn chat(
    user: SessionUser,
    State(services): State<ServiceState>,
    ValidatedJson(body): ValidatedJson<ChatRequest>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let Some(message) = body.message.filter(|m| !m.trim().is_empty()) else {
        return Err(AppError::InvalidInput("message is required".to_string()).into());
    };

    let ctx = ChatContext {
        user_id: user.user_id,
        role: body.user_role.unwrap_or(Role::Member),
        user_projects: body.user_projects.unwrap_or_default(),
    };

    let response = services.chat.respond(&message, &ctx).await?;
    Ok(Json(serde_json::json!({ "response": response })))
}
