use carbonledger_core::models::{validate_material, EmissionScope, Material};
use carbonledger_core::AppError;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const MATERIAL_COLUMNS: &str = "id, organization_id, name, category, scope, unit, \
     emission_factor, source, material_code, comments, created_at, updated_at";

/// Fields accepted when creating or updating an emission-factor record.
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub name: String,
    pub category: String,
    pub scope: EmissionScope,
    pub unit: String,
    pub emission_factor: Decimal,
    pub source: Option<String>,
    pub material_code: Option<String>,
    pub comments: Option<String>,
}

#[derive(Clone)]
pub struct MaterialRepository {
    pool: PgPool,
}

impl MaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        new: NewMaterial,
    ) -> Result<Material, AppError> {
        validate_material(new.scope, &new.category, new.emission_factor)?;

        let material = sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO materials
              (organization_id, name, category, scope, unit, emission_factor,
               source, material_code, comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(organization_id)
        .bind(&new.name)
        .bind(&new.category)
        .bind(new.scope)
        .bind(&new.unit)
        .bind(new.emission_factor)
        .bind(&new.source)
        .bind(&new.material_code)
        .bind(&new.comments)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create material: {}", e);
            AppError::Internal("Failed to create material".to_string())
        })?;

        tracing::info!(
            material_id = %material.id,
            organization_id = %organization_id,
            "Created material"
        );
        Ok(material)
    }

    pub async fn get(
        &self,
        organization_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<Material>, AppError> {
        let material = sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1 AND organization_id = $2"
        ))
        .bind(material_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch material: {}", e);
            AppError::Internal("Failed to load material".to_string())
        })?;

        Ok(material)
    }

    /// List the organization's material library, optionally filtered by scope.
    pub async fn list(
        &self,
        organization_id: Uuid,
        scope: Option<EmissionScope>,
    ) -> Result<Vec<Material>, AppError> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            r#"
            SELECT {MATERIAL_COLUMNS} FROM materials
            WHERE organization_id = $1
              AND ($2::emission_scope IS NULL OR scope = $2)
            ORDER BY name ASC
            "#
        ))
        .bind(organization_id)
        .bind(scope)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list materials: {}", e);
            AppError::Internal("Failed to load materials".to_string())
        })?;

        Ok(materials)
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        material_id: Uuid,
        new: NewMaterial,
    ) -> Result<Material, AppError> {
        validate_material(new.scope, &new.category, new.emission_factor)?;

        let material = sqlx::query_as::<_, Material>(&format!(
            r#"
            UPDATE materials
            SET name = $3, category = $4, scope = $5, unit = $6,
                emission_factor = $7, source = $8, material_code = $9,
                comments = $10, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(material_id)
        .bind(organization_id)
        .bind(&new.name)
        .bind(&new.category)
        .bind(new.scope)
        .bind(&new.unit)
        .bind(new.emission_factor)
        .bind(&new.source)
        .bind(&new.material_code)
        .bind(&new.comments)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update material: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Material not found".to_string())
            } else {
                AppError::Internal("Failed to update material".to_string())
            }
        })?;

        Ok(material)
    }

    pub async fn delete(&self, organization_id: Uuid, material_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1 AND organization_id = $2")
            .bind(material_id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete material: {}", e);
                AppError::Internal("Failed to delete material".to_string())
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Material not found".to_string()));
        }
        Ok(())
    }
}
