use carbonledger_core::models::OrganizationMember;
use carbonledger_core::{AppError, Role};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_unique_violation;

#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a membership row. The (organization, user) pair is unique;
    /// a duplicate insert surfaces as `AlreadyMember` regardless of whether
    /// the caller pre-checked.
    pub async fn add(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<OrganizationMember, AppError> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, AppError::AlreadyMember))?;

        tracing::info!(
            organization_id = %organization_id,
            user_id = %user_id,
            role = %role,
            "Added organization member"
        );
        Ok(member)
    }

    pub async fn get(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>, AppError> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            r#"
            SELECT id, organization_id, user_id, role, created_at, updated_at
            FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch member: {}", e);
            AppError::Internal("Failed to load member".to_string())
        })?;

        Ok(member)
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<OrganizationMember>, AppError> {
        let members = sqlx::query_as::<_, OrganizationMember>(
            r#"
            SELECT id, organization_id, user_id, role, created_at, updated_at
            FROM organization_members
            WHERE organization_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list members: {}", e);
            AppError::Internal("Failed to load members".to_string())
        })?;

        Ok(members)
    }

    pub async fn update_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<OrganizationMember, AppError> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            r#"
            UPDATE organization_members
            SET role = $3, updated_at = NOW()
            WHERE organization_id = $1 AND user_id = $2
            RETURNING id, organization_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update member role: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Member not found".to_string())
            } else {
                AppError::Internal("Failed to update member".to_string())
            }
        })?;

        Ok(member)
    }

    pub async fn remove(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to remove member: {}", e);
            AppError::Internal("Failed to remove member".to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }
        tracing::info!(
            organization_id = %organization_id,
            user_id = %user_id,
            "Removed organization member"
        );
        Ok(())
    }
}
