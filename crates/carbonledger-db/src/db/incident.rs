use carbonledger_core::models::{
    Incident, IncidentAuditLog, IncidentComment, IncidentPrediction, IncidentSeverity,
    IncidentStatus, IncidentType,
};
use carbonledger_core::{AppError, ProjectScope};
use sqlx::PgPool;
use uuid::Uuid;

use super::transaction::with_transaction;

const INCIDENT_COLUMNS: &str = "id, project_id, organization_id, incident_type_id, title, \
     description, severity, status, location, reported_at, resolved_at, closed_at, \
     assigned_to, created_at, updated_at";

/// Fields accepted when reporting an incident. Status always starts `open`.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub project_id: Uuid,
    pub incident_type_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
    pub location: Option<String>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Clone)]
pub struct IncidentRepository {
    pool: PgPool,
}

impl IncidentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        new: NewIncident,
    ) -> Result<Incident, AppError> {
        let incident = sqlx::query_as::<_, Incident>(&format!(
            r#"
            INSERT INTO incidents
              (project_id, organization_id, incident_type_id, title, description,
               severity, status, location, reported_at, assigned_to)
            VALUES ($1, $2, $3, $4, $5, $6, 'open', $7, NOW(), $8)
            RETURNING {INCIDENT_COLUMNS}
            "#
        ))
        .bind(new.project_id)
        .bind(organization_id)
        .bind(new.incident_type_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.severity)
        .bind(&new.location)
        .bind(new.assigned_to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create incident: {}", e);
            AppError::Internal("Failed to create incident".to_string())
        })?;

        tracing::info!(
            incident_id = %incident.id,
            project_id = %incident.project_id,
            severity = ?incident.severity,
            "Reported incident"
        );
        Ok(incident)
    }

    /// Fetch one incident, subject to the caller's project scope. Out of
    /// scope reads as absent.
    pub async fn get(
        &self,
        organization_id: Uuid,
        incident_id: Uuid,
        scope: &ProjectScope,
    ) -> Result<Option<Incident>, AppError> {
        let incident = sqlx::query_as::<_, Incident>(&format!(
            r#"
            SELECT {INCIDENT_COLUMNS} FROM incidents
            WHERE id = $1 AND organization_id = $2
              AND ($3::uuid[] IS NULL OR project_id = ANY($3))
            "#
        ))
        .bind(incident_id)
        .bind(organization_id)
        .bind(scope.as_filter())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch incident: {}", e);
            AppError::Internal("Failed to load incident".to_string())
        })?;

        Ok(incident)
    }

    /// List incidents visible to the caller, optionally for one project.
    pub async fn list(
        &self,
        organization_id: Uuid,
        scope: &ProjectScope,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Incident>, AppError> {
        let incidents = sqlx::query_as::<_, Incident>(&format!(
            r#"
            SELECT {INCIDENT_COLUMNS} FROM incidents
            WHERE organization_id = $1
              AND ($2::uuid[] IS NULL OR project_id = ANY($2))
              AND ($3::uuid IS NULL OR project_id = $3)
            ORDER BY reported_at DESC
            "#
        ))
        .bind(organization_id)
        .bind(scope.as_filter())
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list incidents: {}", e);
            AppError::Internal("Failed to load incidents".to_string())
        })?;

        Ok(incidents)
    }

    /// Update the mutable descriptive fields of an incident. Status changes
    /// go through [transition](Self::transition) only.
    pub async fn update_details(
        &self,
        organization_id: Uuid,
        incident_id: Uuid,
        title: &str,
        description: Option<&str>,
        severity: IncidentSeverity,
        location: Option<&str>,
        assigned_to: Option<Uuid>,
    ) -> Result<Incident, AppError> {
        let incident = sqlx::query_as::<_, Incident>(&format!(
            r#"
            UPDATE incidents
            SET title = $3, description = $4, severity = $5, location = $6,
                assigned_to = $7, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {INCIDENT_COLUMNS}
            "#
        ))
        .bind(incident_id)
        .bind(organization_id)
        .bind(title)
        .bind(description)
        .bind(severity)
        .bind(location)
        .bind(assigned_to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update incident: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Incident not found".to_string())
            } else {
                AppError::Internal("Failed to update incident".to_string())
            }
        })?;

        Ok(incident)
    }

    /// Move an incident along the `open -> in_progress -> resolved -> closed`
    /// chain. The current row is locked, the transition validated, the
    /// timestamp for the new state set exactly once, and an audit-log row
    /// appended - all in one transaction.
    pub async fn transition(
        &self,
        organization_id: Uuid,
        incident_id: Uuid,
        next: IncidentStatus,
        performed_by: Uuid,
        details: Option<String>,
    ) -> Result<Incident, AppError> {
        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let current = sqlx::query_scalar::<_, IncidentStatus>(
                    r#"
                    SELECT status FROM incidents
                    WHERE id = $1 AND organization_id = $2
                    FOR UPDATE
                    "#,
                )
                .bind(incident_id)
                .bind(organization_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Incident not found".to_string()))?;

                let action = current.transition(next)?;

                // resolved_at/closed_at are set exactly once and never cleared.
                let incident = sqlx::query_as::<_, Incident>(&format!(
                    r#"
                    UPDATE incidents
                    SET status = $3,
                        resolved_at = CASE WHEN $3 = 'resolved' AND resolved_at IS NULL
                                           THEN NOW() ELSE resolved_at END,
                        closed_at = CASE WHEN $3 = 'closed' AND closed_at IS NULL
                                         THEN NOW() ELSE closed_at END,
                        updated_at = NOW()
                    WHERE id = $1 AND organization_id = $2
                    RETURNING {INCIDENT_COLUMNS}
                    "#
                ))
                .bind(incident_id)
                .bind(organization_id)
                .bind(next)
                .fetch_one(&mut **tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO incident_audit_logs (incident_id, action, performed_by, details)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(incident_id)
                .bind(action)
                .bind(performed_by)
                .bind(&details)
                .execute(&mut **tx)
                .await?;

                tracing::info!(
                    incident_id = %incident_id,
                    action = action,
                    performed_by = %performed_by,
                    "Incident status transition"
                );
                Ok(incident)
            })
        })
        .await
    }

    pub async fn add_comment(
        &self,
        incident_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<IncidentComment, AppError> {
        let comment = sqlx::query_as::<_, IncidentComment>(
            r#"
            INSERT INTO incident_comments (incident_id, author_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, incident_id, author_id, body, created_at
            "#,
        )
        .bind(incident_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to add incident comment: {}", e);
            AppError::Internal("Failed to add comment".to_string())
        })?;

        Ok(comment)
    }

    pub async fn list_comments(
        &self,
        incident_id: Uuid,
    ) -> Result<Vec<IncidentComment>, AppError> {
        let comments = sqlx::query_as::<_, IncidentComment>(
            r#"
            SELECT id, incident_id, author_id, body, created_at
            FROM incident_comments
            WHERE incident_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(incident_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list incident comments: {}", e);
            AppError::Internal("Failed to load comments".to_string())
        })?;

        Ok(comments)
    }

    pub async fn list_audit_logs(
        &self,
        incident_id: Uuid,
    ) -> Result<Vec<IncidentAuditLog>, AppError> {
        let logs = sqlx::query_as::<_, IncidentAuditLog>(
            r#"
            SELECT id, incident_id, action, performed_by, details, created_at
            FROM incident_audit_logs
            WHERE incident_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(incident_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list incident audit logs: {}", e);
            AppError::Internal("Failed to load audit log".to_string())
        })?;

        Ok(logs)
    }

    pub async fn add_prediction(
        &self,
        incident_id: Uuid,
        prediction: serde_json::Value,
    ) -> Result<IncidentPrediction, AppError> {
        let row = sqlx::query_as::<_, IncidentPrediction>(
            r#"
            INSERT INTO incident_predictions (incident_id, prediction)
            VALUES ($1, $2)
            RETURNING id, incident_id, prediction, created_at
            "#,
        )
        .bind(incident_id)
        .bind(sqlx::types::Json(prediction))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store incident prediction: {}", e);
            AppError::Internal("Failed to store prediction".to_string())
        })?;

        Ok(row)
    }

    pub async fn list_predictions(
        &self,
        incident_id: Uuid,
    ) -> Result<Vec<IncidentPrediction>, AppError> {
        let rows = sqlx::query_as::<_, IncidentPrediction>(
            r#"
            SELECT id, incident_id, prediction, created_at
            FROM incident_predictions
            WHERE incident_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(incident_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list incident predictions: {}", e);
            AppError::Internal("Failed to load predictions".to_string())
        })?;

        Ok(rows)
    }
}

#[derive(Clone)]
pub struct IncidentTypeRepository {
    pool: PgPool,
}

impl IncidentTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<IncidentType, AppError> {
        let incident_type = sqlx::query_as::<_, IncidentType>(
            r#"
            INSERT INTO incident_types (organization_id, name, description, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, organization_id, name, description, active, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create incident type: {}", e);
            AppError::Internal("Failed to create incident type".to_string())
        })?;

        Ok(incident_type)
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<IncidentType>, AppError> {
        let types = sqlx::query_as::<_, IncidentType>(
            r#"
            SELECT id, organization_id, name, description, active, created_at, updated_at
            FROM incident_types
            WHERE organization_id = $1 AND (NOT $2 OR active)
            ORDER BY name ASC
            "#,
        )
        .bind(organization_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list incident types: {}", e);
            AppError::Internal("Failed to load incident types".to_string())
        })?;

        Ok(types)
    }

    pub async fn set_active(
        &self,
        organization_id: Uuid,
        incident_type_id: Uuid,
        active: bool,
    ) -> Result<IncidentType, AppError> {
        let incident_type = sqlx::query_as::<_, IncidentType>(
            r#"
            UPDATE incident_types
            SET active = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, description, active, created_at, updated_at
            "#,
        )
        .bind(incident_type_id)
        .bind(organization_id)
        .bind(active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update incident type: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Incident type not found".to_string())
            } else {
                AppError::Internal("Failed to update incident type".to_string())
            }
        })?;

        Ok(incident_type)
    }
}
