use carbonledger_core::models::{Upload, UploadStatus};
use carbonledger_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an upload in `processing` state.
    pub async fn create(
        &self,
        project_id: Uuid,
        name: &str,
        size: i64,
        created_by: Uuid,
    ) -> Result<Upload, AppError> {
        let upload = sqlx::query_as::<_, Upload>(
            r#"
            INSERT INTO uploads (project_id, name, size, status, created_by)
            VALUES ($1, $2, $3, 'processing', $4)
            RETURNING id, project_id, name, size, status, created_at, created_by
            "#,
        )
        .bind(project_id)
        .bind(name)
        .bind(size)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record upload: {}", e);
            AppError::Internal("Failed to record upload".to_string())
        })?;

        Ok(upload)
    }

    pub async fn get(&self, project_id: Uuid, upload_id: Uuid) -> Result<Option<Upload>, AppError> {
        let upload = sqlx::query_as::<_, Upload>(
            r#"
            SELECT id, project_id, name, size, status, created_at, created_by
            FROM uploads
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(upload_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch upload: {}", e);
            AppError::Internal("Failed to load upload".to_string())
        })?;

        Ok(upload)
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Upload>, AppError> {
        let uploads = sqlx::query_as::<_, Upload>(
            r#"
            SELECT id, project_id, name, size, status, created_at, created_by
            FROM uploads
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list uploads: {}", e);
            AppError::Internal("Failed to load uploads".to_string())
        })?;

        Ok(uploads)
    }

    pub async fn update_status(
        &self,
        project_id: Uuid,
        upload_id: Uuid,
        status: UploadStatus,
    ) -> Result<Upload, AppError> {
        let upload = sqlx::query_as::<_, Upload>(
            r#"
            UPDATE uploads
            SET status = $3
            WHERE id = $1 AND project_id = $2
            RETURNING id, project_id, name, size, status, created_at, created_by
            "#,
        )
        .bind(upload_id)
        .bind(project_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update upload status: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Upload not found".to_string())
            } else {
                AppError::Internal("Failed to update upload".to_string())
            }
        })?;

        Ok(upload)
    }
}
