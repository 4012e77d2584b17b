use carbonledger_core::models::{
    EmissionsData, Project, ProjectInvite, ProjectMember, ProjectStatus, ProjectType,
};
use carbonledger_core::{AppError, ProjectScope, Role};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_unique_violation;

const PROJECT_COLUMNS: &str = "id, organization_id, name, description, project_type, code, \
     status, location, parent_id, emissions_data, created_at, updated_at, created_by, updated_by";

/// Fields accepted when creating or updating a project / business unit.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub project_type: ProjectType,
    pub code: Option<String>,
    pub status: ProjectStatus,
    pub location: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A project's parent, if set, must be a business unit in the same
    /// organization. Checked before insert/update; the FK holds referential
    /// integrity, the type rule is application-enforced.
    async fn check_parent(
        &self,
        organization_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        let parent_type = sqlx::query_scalar::<_, ProjectType>(
            "SELECT project_type FROM projects WHERE id = $1 AND organization_id = $2",
        )
        .bind(parent_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check parent project: {}", e);
            AppError::Internal("Failed to check parent".to_string())
        })?;

        match parent_type {
            Some(ProjectType::BusinessUnit) => Ok(()),
            Some(ProjectType::Project) => Err(AppError::InvalidInput(
                "Parent must be a business unit".to_string(),
            )),
            None => Err(AppError::NotFound("Parent business unit not found".to_string())),
        }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        new: NewProject,
        created_by: Uuid,
    ) -> Result<Project, AppError> {
        self.check_parent(organization_id, new.parent_id).await?;

        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects
              (organization_id, name, description, project_type, code, status,
               location, parent_id, emissions_data, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(organization_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.project_type)
        .bind(&new.code)
        .bind(new.status)
        .bind(&new.location)
        .bind(new.parent_id)
        .bind(sqlx::types::Json(EmissionsData::default()))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create project: {}", e);
            AppError::Internal("Failed to create project".to_string())
        })?;

        tracing::info!(
            project_id = %project.id,
            organization_id = %organization_id,
            project_type = ?project.project_type,
            "Created project"
        );
        Ok(project)
    }

    /// Fetch one project, subject to the caller's scope. A project outside
    /// the scope reads as absent.
    pub async fn get(
        &self,
        organization_id: Uuid,
        project_id: Uuid,
        scope: &ProjectScope,
    ) -> Result<Option<Project>, AppError> {
        if !scope.allows(project_id) {
            return Ok(None);
        }
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND organization_id = $2"
        ))
        .bind(project_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch project: {}", e);
            AppError::Internal("Failed to load project".to_string())
        })?;

        Ok(project)
    }

    /// List projects in an organization, restricted by the caller's scope
    /// and optionally by type (projects vs business units).
    pub async fn list(
        &self,
        organization_id: Uuid,
        scope: &ProjectScope,
        project_type: Option<ProjectType>,
    ) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS} FROM projects
            WHERE organization_id = $1
              AND ($2::uuid[] IS NULL OR id = ANY($2))
              AND ($3::project_type IS NULL OR project_type = $3)
            ORDER BY created_at DESC
            "#
        ))
        .bind(organization_id)
        .bind(scope.as_filter())
        .bind(project_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list projects: {}", e);
            AppError::Internal("Failed to load projects".to_string())
        })?;

        Ok(projects)
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        project_id: Uuid,
        new: NewProject,
        updated_by: Uuid,
    ) -> Result<Project, AppError> {
        self.check_parent(organization_id, new.parent_id).await?;

        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET name = $3, description = $4, project_type = $5, code = $6,
                status = $7, location = $8, parent_id = $9, updated_by = $10,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(organization_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.project_type)
        .bind(&new.code)
        .bind(new.status)
        .bind(&new.location)
        .bind(new.parent_id)
        .bind(updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update project: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Project not found".to_string())
            } else {
                AppError::Internal("Failed to update project".to_string())
            }
        })?;

        Ok(project)
    }

    /// Replace the stored scope totals/deltas for a project.
    pub async fn update_emissions(
        &self,
        organization_id: Uuid,
        project_id: Uuid,
        emissions: &EmissionsData,
        updated_by: Uuid,
    ) -> Result<Project, AppError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET emissions_data = $3, updated_by = $4, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(organization_id)
        .bind(sqlx::types::Json(emissions))
        .bind(updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update project emissions: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Project not found".to_string())
            } else {
                AppError::Internal("Failed to update project".to_string())
            }
        })?;

        Ok(project)
    }

    /// Delete a project. Memberships, invites, uploads, and incidents go
    /// with it via FK cascades.
    pub async fn delete(&self, organization_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND organization_id = $2")
            .bind(project_id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete project: {}", e);
                AppError::Internal("Failed to delete project".to_string())
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }
        tracing::info!(project_id = %project_id, "Deleted project");
        Ok(())
    }

    /// The organization a project belongs to, for callers holding only a
    /// project id.
    pub async fn organization_of(&self, project_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let organization_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT organization_id FROM projects WHERE id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve project organization: {}", e);
            AppError::Internal("Failed to load project".to_string())
        })?;

        Ok(organization_id)
    }

    /// Ids of all projects the user is an explicit member of within one
    /// organization. Feeds `ProjectScope::Members`.
    pub async fn member_project_ids(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT p.id
            FROM projects p
            JOIN project_members pm ON pm.project_id = p.id
            WHERE p.organization_id = $1 AND pm.user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list member project ids: {}", e);
            AppError::Internal("Failed to load project memberships".to_string())
        })?;

        Ok(ids)
    }

    pub async fn add_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<ProjectMember, AppError> {
        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, AppError::AlreadyMember))?;

        Ok(member)
    }

    pub async fn list_members(&self, project_id: Uuid) -> Result<Vec<ProjectMember>, AppError> {
        let members = sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT id, project_id, user_id, role, created_at, updated_at
            FROM project_members
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list project members: {}", e);
            AppError::Internal("Failed to load project members".to_string())
        })?;

        Ok(members)
    }

    pub async fn remove_member(&self, project_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to remove project member: {}", e);
                    AppError::Internal("Failed to remove project member".to_string())
                })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project member not found".to_string()));
        }
        Ok(())
    }

    /// Record an email-targeted project invite. Dispatch is simulated by the
    /// caller; only the row is persisted here.
    pub async fn create_invite(
        &self,
        project_id: Uuid,
        email: &str,
        role: Role,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<ProjectInvite, AppError> {
        let invite = sqlx::query_as::<_, ProjectInvite>(
            r#"
            INSERT INTO project_invites (project_id, email, role, created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, email, role, created_by, expires_at, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(email)
        .bind(role)
        .bind(created_by)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create project invite: {}", e);
            AppError::Internal("Failed to create invitation".to_string())
        })?;

        Ok(invite)
    }

    pub async fn list_invites(
        &self,
        project_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectInvite>, AppError> {
        let invites = sqlx::query_as::<_, ProjectInvite>(
            r#"
            SELECT id, project_id, email, role, created_by, expires_at, created_at, updated_at
            FROM project_invites
            WHERE project_id = $1 AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list project invites: {}", e);
            AppError::Internal("Failed to load invitations".to_string())
        })?;

        Ok(invites)
    }
}
