use carbonledger_core::models::{OrganizationInvite, OrganizationMember};
use carbonledger_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_unique_violation;
use super::transaction::with_transaction;

#[derive(Clone)]
pub struct InviteRepository {
    pool: PgPool,
}

impl InviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a freshly generated invite code. Codes carry a unique
    /// constraint; a generation collision surfaces as a typed conflict so
    /// the caller can regenerate.
    pub async fn create(
        &self,
        organization_id: Uuid,
        code: &str,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<OrganizationInvite, AppError> {
        let invite = sqlx::query_as::<_, OrganizationInvite>(
            r#"
            INSERT INTO organization_invites (organization_id, code, created_by, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, code, created_by, expires_at, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(code)
        .bind(created_by)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                AppError::InvalidInput("Invite code collision; retry".to_string()),
            )
        })?;

        tracing::info!(
            organization_id = %organization_id,
            invite_id = %invite.id,
            "Generated organization invite"
        );
        Ok(invite)
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<OrganizationInvite>, AppError> {
        let invite = sqlx::query_as::<_, OrganizationInvite>(
            r#"
            SELECT id, organization_id, code, created_by, expires_at, created_at, updated_at
            FROM organization_invites
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch invite: {}", e);
            AppError::Internal("Failed to load invite".to_string())
        })?;

        Ok(invite)
    }

    /// Unexpired invites for an organization.
    pub async fn list_active(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrganizationInvite>, AppError> {
        let invites = sqlx::query_as::<_, OrganizationInvite>(
            r#"
            SELECT id, organization_id, code, created_by, expires_at, created_at, updated_at
            FROM organization_invites
            WHERE organization_id = $1 AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list invites: {}", e);
            AppError::Internal("Failed to load invites".to_string())
        })?;

        Ok(invites)
    }

    /// Atomically convert an invite into a membership: the invite row is
    /// deleted and the member row inserted in one transaction, so a code is
    /// single-use even under concurrent redemption. The delete doubles as
    /// the existence check; losing the race surfaces as `InvalidInviteCode`.
    pub async fn consume(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
    ) -> Result<OrganizationMember, AppError> {
        let member = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let organization_id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    DELETE FROM organization_invites
                    WHERE id = $1
                    RETURNING organization_id
                    "#,
                )
                .bind(invite_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::InvalidInviteCode)?;

                let member = sqlx::query_as::<_, OrganizationMember>(
                    r#"
                    INSERT INTO organization_members (organization_id, user_id, role)
                    VALUES ($1, $2, 'member')
                    RETURNING id, organization_id, user_id, role, created_at, updated_at
                    "#,
                )
                .bind(organization_id)
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| map_unique_violation(e, AppError::AlreadyMember))?;

                Ok(member)
            })
        })
        .await?;

        tracing::info!(
            organization_id = %member.organization_id,
            user_id = %user_id,
            "Redeemed organization invite"
        );
        Ok(member)
    }

    pub async fn delete(&self, organization_id: Uuid, invite_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM organization_invites WHERE id = $1 AND organization_id = $2",
        )
        .bind(invite_id)
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete invite: {}", e);
            AppError::Internal("Failed to delete invite".to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Invite not found".to_string()));
        }
        Ok(())
    }
}
