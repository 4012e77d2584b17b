use carbonledger_core::models::{Organization, OrganizationWithRole};
use carbonledger_core::{AppError, Role};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_unique_violation;
use super::transaction::with_transaction;

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an organization together with its owner membership and a free
    /// subscription, atomically. An organization never exists without an
    /// owner; a slug collision (lost race after the caller's pre-check)
    /// surfaces as `DuplicateSlug` so the caller can retry with a new suffix.
    pub async fn create_with_owner(
        &self,
        name: &str,
        slug: &str,
        is_demo: bool,
        trial_ends_at: Option<DateTime<Utc>>,
        owner_id: Uuid,
    ) -> Result<Organization, AppError> {
        let name = name.to_string();
        let slug_owned = slug.to_string();
        let organization = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let organization = sqlx::query_as::<_, Organization>(
                    r#"
                    INSERT INTO organizations (name, slug, is_demo, trial_ends_at)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, name, slug, is_demo, trial_ends_at, created_at, updated_at
                    "#,
                )
                .bind(&name)
                .bind(&slug_owned)
                .bind(is_demo)
                .bind(trial_ends_at)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    map_unique_violation(
                        e,
                        AppError::DuplicateSlug {
                            name: name.clone(),
                            slug: slug_owned.clone(),
                        },
                    )
                })?;

                sqlx::query(
                    r#"
                    INSERT INTO organization_members (organization_id, user_id, role)
                    VALUES ($1, $2, 'owner')
                    "#,
                )
                .bind(organization.id)
                .bind(owner_id)
                .execute(&mut **tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO subscriptions (organization_id, plan, status)
                    VALUES ($1, 'free', 'active')
                    "#,
                )
                .bind(organization.id)
                .execute(&mut **tx)
                .await?;

                Ok(organization)
            })
        })
        .await?;

        tracing::info!(
            organization_id = %organization.id,
            slug = %organization.slug,
            "Created organization with owner membership"
        );
        Ok(organization)
    }

    /// Whether a slug is already taken.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM organizations WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check slug availability: {}", e);
            AppError::Internal("Failed to check slug availability".to_string())
        })?;

        Ok(exists)
    }

    pub async fn get(&self, organization_id: Uuid) -> Result<Option<Organization>, AppError> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, is_demo, trial_ends_at, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch organization: {}", e);
            AppError::Internal("Failed to fetch organization".to_string())
        })?;

        Ok(organization)
    }

    /// Organizations the user belongs to, joined with their role. Returns an
    /// empty list (not an error) for a user with no memberships.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrganizationWithRole>, AppError> {
        let organizations = sqlx::query_as::<_, OrganizationWithRole>(
            r#"
            SELECT o.id, o.name, o.slug, o.is_demo, o.trial_ends_at,
                   m.role, o.created_at, o.updated_at
            FROM organizations o
            JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list organizations for user: {}", e);
            AppError::Internal("Failed to load organizations".to_string())
        })?;

        Ok(organizations)
    }

    pub async fn update_name(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Organization, AppError> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, is_demo, trial_ends_at, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update organization name: {}", e);
            if let sqlx::Error::RowNotFound = e {
                AppError::OrganizationNotFound(organization_id.to_string())
            } else {
                AppError::Internal("Failed to update organization".to_string())
            }
        })?;

        Ok(organization)
    }

    /// Delete an organization. Child rows (memberships, invites, projects,
    /// incidents, materials, subscriptions) go with it via FK cascades.
    pub async fn delete(&self, organization_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete organization: {}", e);
                AppError::Internal("Failed to delete organization".to_string())
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::OrganizationNotFound(organization_id.to_string()));
        }
        tracing::info!(organization_id = %organization_id, "Deleted organization");
        Ok(())
    }

    /// The caller's membership in an organization, if any.
    pub async fn member_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_scalar::<_, Role>(
            r#"
            SELECT role FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch membership role: {}", e);
            AppError::Internal("Failed to load membership".to_string())
        })?;

        Ok(role)
    }
}
