use axum::{
    extract::{Path, Query, State},
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
use carbonledger_core::models::{
    Incident, IncidentComment, IncidentSeverity, IncidentStatus, IncidentType,
};
use carbonledger_core::AppError;
use carbonledger_db::db::incident::NewIncident;

use super::{caller_scope, can_edit_project, require_edit};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentRequest {
    pub project_id: Uuid,
    pub incident_type_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
    pub location: Option<String>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListIncidentsQuery {
    pub project_id: Option<Uuid>,
}

/// Report an incident on a visible project. Status always starts `open`.
#[utoipa::path(
    post,
    path = "/api/organizations/{organization_id}/incidents",
    request_body = CreateIncidentRequest,
    responses(
        (status = 201, description = "Incident reported", body = Incident),
        (status = 404, description = "Project not visible to the caller")
    ),
    tag = "incidents"
)]
#[tracing::instrument(skip(state, body))]
pub async fn create_incident(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<Incident>), HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    if !scope.allows(body.project_id) {
        return Err(AppError::NotFound("Project not found".to_string()).into());
    }
    if body.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Incident title must not be empty".to_string()).into());
    }

    let incident = state
        .db
        .incident_repository
        .create(
            organization_id,
            NewIncident {
                project_id: body.project_id,
                incident_type_id: body.incident_type_id,
                title: body.title.trim().to_string(),
                description: body.description,
                severity: body.severity,
                location: body.location,
                assigned_to: body.assigned_to,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(incident)))
}

/// List incidents visible to the caller, optionally for one project.
#[tracing::instrument(skip(state))]
pub async fn list_incidents(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    Query(query): Query<ListIncidentsQuery>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;

    let incidents = state
        .db
        .incident_repository
        .list(organization_id, &scope, query.project_id)
        .await?;

    Ok(Json(serde_json::json!({
        "incidents": incidents,
        "count": incidents.len(),
    })))
}

#[tracing::instrument(skip(state))]
pub async fn get_incident(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Incident>, HttpAppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;

    let incident = state
        .db
        .incident_repository
        .get(organization_id, incident_id, &scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Incident not found".to_string()))?;

    Ok(Json(incident))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncidentRequest {
    pub title: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
    pub location: Option<String>,
    pub assigned_to: Option<Uuid>,
}

/// Update an incident's descriptive fields. Status moves through the
/// dedicated status endpoint only.
#[tracing::instrument(skip(state, body))]
pub async fn update_incident(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<UpdateIncidentRequest>,
) -> Result<Json<Incident>, HttpAppError> {
    let incident = fetch_editable(&state, organization_id, incident_id, &user).await?;

    let updated = state
        .db
        .incident_repository
        .update_details(
            organization_id,
            incident.id,
            body.title.trim(),
            body.description.as_deref(),
            body.severity,
            body.location.as_deref(),
            body.assigned_to,
        )
        .await?;

    Ok(Json(updated))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub status: IncidentStatus,
    /// Optional note recorded in the audit log (e.g. a closure reason).
    pub note: Option<String>,
}

/// Move an incident forward along `open -> in_progress -> resolved ->
/// closed`. Every transition appends an audit-log entry; `closed` is
/// terminal.
#[utoipa::path(
    post,
    path = "/api/organizations/{organization_id}/incidents/{incident_id}/status",
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Incident transitioned", body = Incident),
        (status = 400, description = "Illegal transition"),
        (status = 403, description = "No edit rights on the owning project")
    ),
    tag = "incidents"
)]
#[tracing::instrument(skip(state, body))]
pub async fn transition_incident(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<TransitionRequest>,
) -> Result<Json<Incident>, HttpAppError> {
    fetch_editable(&state, organization_id, incident_id, &user).await?;

    let incident = state
        .db
        .incident_repository
        .transition(
            organization_id,
            incident_id,
            body.status,
            user.user_id,
            body.note,
        )
        .await?;

    Ok(Json(incident))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub body: String,
}

/// Comment on an incident. Any member who can see it may comment.
#[tracing::instrument(skip(state, body))]
pub async fn add_comment(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<CommentRequest>,
) -> Result<(StatusCode, Json<IncidentComment>), HttpAppError> {
    fetch_visible(&state, organization_id, incident_id, &user).await?;

    if body.body.trim().is_empty() {
        return Err(AppError::InvalidInput("Comment must not be empty".to_string()).into());
    }

    let comment = state
        .db
        .incident_repository
        .add_comment(incident_id, user.user_id, body.body.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[tracing::instrument(skip(state))]
pub async fn list_comments(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    fetch_visible(&state, organization_id, incident_id, &user).await?;

    let comments = state
        .db
        .incident_repository
        .list_comments(incident_id)
        .await?;

    Ok(Json(serde_json::json!({
        "comments": comments,
        "count": comments.len(),
    })))
}

#[tracing::instrument(skip(state))]
pub async fn list_audit_logs(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    fetch_visible(&state, organization_id, incident_id, &user).await?;

    let logs = state
        .db
        .incident_repository
        .list_audit_logs(incident_id)
        .await?;

    Ok(Json(serde_json::json!({
        "audit_logs": logs,
        "count": logs.len(),
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub historical_data: serde_json::Value,
    pub timeframe: String,
}

/// Run an AI prediction for an incident and record it as an append-only
/// prediction row.
#[tracing::instrument(skip(state, body))]
pub async fn create_prediction(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<PredictRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), HttpAppError> {
    fetch_visible(&state, organization_id, incident_id, &user).await?;

    let analysis = state
        .services
        .analysis
        .as_ref()
        .ok_or_else(|| AppError::AiService("AI analysis is not configured".to_string()))?;

    let prediction = analysis
        .predict_emissions(&body.historical_data, &body.timeframe)
        .await?;

    let stored = state
        .db
        .incident_repository
        .add_prediction(
            incident_id,
            serde_json::to_value(&prediction).map_err(AppError::from)?,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "prediction": stored })),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn list_predictions(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    fetch_visible(&state, organization_id, incident_id, &user).await?;

    let predictions = state
        .db
        .incident_repository
        .list_predictions(incident_id)
        .await?;

    Ok(Json(serde_json::json!({
        "predictions": predictions,
        "count": predictions.len(),
    })))
}

// ----- Incident types -----

#[derive(Debug, Deserialize, ToSchema)]
pub struct IncidentTypeRequest {
    pub name: String,
    pub description: Option<String>,
}

#[tracing::instrument(skip(state, body))]
pub async fn create_incident_type(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<IncidentTypeRequest>,
) -> Result<(StatusCode, Json<IncidentType>), HttpAppError> {
    let (role, _) = caller_scope(&state.db, organization_id, user.user_id).await?;
    require_edit(role)?;

    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Name must not be empty".to_string()).into());
    }

    let incident_type = state
        .db
        .incident_type_repository
        .create(organization_id, body.name.trim(), body.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(incident_type)))
}

#[derive(Debug, Deserialize)]
pub struct ListIncidentTypesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[tracing::instrument(skip(state))]
pub async fn list_incident_types(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    Query(query): Query<ListIncidentTypesQuery>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    caller_scope(&state.db, organization_id, user.user_id).await?;

    let types = state
        .db
        .incident_type_repository
        .list(organization_id, !query.include_inactive)
        .await?;

    Ok(Json(serde_json::json!({
        "incident_types": types,
        "count": types.len(),
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[tracing::instrument(skip(state, body))]
pub async fn set_incident_type_active(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, incident_type_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<SetActiveRequest>,
) -> Result<Json<IncidentType>, HttpAppError> {
    let (role, _) = caller_scope(&state.db, organization_id, user.user_id).await?;
    require_edit(role)?;

    let incident_type = state
        .db
        .incident_type_repository
        .set_active(organization_id, incident_type_id, body.active)
        .await?;

    Ok(Json(incident_type))
}

// ----- Shared lookups -----

/// The incident, if visible to the caller.
async fn fetch_visible(
    state: &AppState,
    organization_id: Uuid,
    incident_id: Uuid,
    user: &SessionUser,
) -> Result<Incident, AppError> {
    let (_, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    state
        .db
        .incident_repository
        .get(organization_id, incident_id, &scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Incident not found".to_string()))
}

/// The incident, if visible and mutable by the caller (edit rights on the
/// owning project).
async fn fetch_editable(
    state: &AppState,
    organization_id: Uuid,
    incident_id: Uuid,
    user: &SessionUser,
) -> Result<Incident, AppError> {
    let (role, scope) = caller_scope(&state.db, organization_id, user.user_id).await?;
    let incident = state
        .db
        .incident_repository
        .get(organization_id, incident_id, &scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Incident not found".to_string()))?;

    if !can_edit_project(&state.db, role, incident.project_id, user.user_id).await? {
        return Err(AppError::Forbidden(
            "You do not have edit rights on this incident's project".to_string(),
        ));
    }
    Ok(incident)
}
