use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use carbonledger_core::models::{EmissionScope, Material};
use carbonledger_core::AppError;
use carbonledger_db::db::material::NewMaterial;

use super::{caller_scope, require_edit};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequest {
    pub name: String,
    pub category: String,
    pub scope: EmissionScope,
    pub unit: String,
    pub emission_factor: Decimal,
    pub source: Option<String>,
    pub material_code: Option<String>,
    pub comments: Option<String>,
}

impl MaterialRequest {
    fn into_new_material(self) -> Result<NewMaterial, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Material name must not be empty".to_string(),
            ));
        }
        Ok(NewMaterial {
            name: self.name.trim().to_string(),
            category: self.category,
            scope: self.scope,
            unit: self.unit,
            emission_factor: self.emission_factor,
            source: self.source,
            material_code: self.material_code,
            comments: self.comments,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListMaterialsQuery {
    pub scope: Option<EmissionScope>,
}

/// The organization's emission-factor library. Any member may read it.
#[tracing::instrument(skip(state))]
pub async fn list_materials(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    Query(query): Query<ListMaterialsQuery>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    caller_scope(&state.db, organization_id, user.user_id).await?;

    let materials = state
        .db
        .material_repository
        .list(organization_id, query.scope)
        .await?;

    Ok(Json(serde_json::json!({
        "materials": materials,
        "count": materials.len(),
    })))
}

/// Add an emission factor to the library. Owners and admins only.
#[tracing::instrument(skip(state, body))]
pub async fn create_material(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<MaterialRequest>,
) -> Result<(StatusCode, Json<Material>), HttpAppError> {
    let (role, _) = caller_scope(&state.db, organization_id, user.user_id).await?;
    require_edit(role)?;

    let material = state
        .db
        .material_repository
        .create(organization_id, body.into_new_material()?)
        .await?;

    Ok((StatusCode::CREATED, Json(material)))
}

#[tracing::instrument(skip(state))]
pub async fn get_material(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, material_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Material>, HttpAppError> {
    caller_scope(&state.db, organization_id, user.user_id).await?;

    let material = state
        .db
        .material_repository
        .get(organization_id, material_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;

    Ok(Json(material))
}

#[tracing::instrument(skip(state, body))]
pub async fn update_material(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, material_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<MaterialRequest>,
) -> Result<Json<Material>, HttpAppError> {
    let (role, _) = caller_scope(&state.db, organization_id, user.user_id).await?;
    require_edit(role)?;

    let material = state
        .db
        .material_repository
        .update(organization_id, material_id, body.into_new_material()?)
        .await?;

    Ok(Json(material))
}

#[tracing::instrument(skip(state))]
pub async fn delete_material(
    user: SessionUser,
    State(state): State<Arc<AppState>>,
    Path((organization_id, material_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let (role, _) = caller_scope(&state.db, organization_id, user.user_id).await?;
    require_edit(role)?;

    state
        .db
        .material_repository
        .delete(organization_id, material_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
