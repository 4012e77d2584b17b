//! Store trait abstractions for service testing
//!
//! These traits define the minimal interface the service layer needs from the
//! repositories, allowing for easy mocking and testing without database
//! dependencies. The membership workflow and the chat responder are the two
//! consumers; plain CRUD handlers use the concrete repositories directly.

use async_trait::async_trait;
use carbonledger_core::models::{
    Incident, Organization, OrganizationInvite, OrganizationMember, OrganizationWithRole, Project,
};
use carbonledger_core::AppError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{InviteRepository, MemberRepository, OrganizationRepository};

/// Persistence operations behind the membership and invitation workflow.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;

    /// Insert organization + owner membership + default subscription
    /// atomically. Must fail with `DuplicateSlug` on a slug race.
    async fn create_organization_with_owner(
        &self,
        name: &str,
        slug: &str,
        is_demo: bool,
        trial_ends_at: Option<DateTime<Utc>>,
        owner_id: Uuid,
    ) -> Result<Organization, AppError>;

    async fn list_organizations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrganizationWithRole>, AppError>;

    async fn get_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>, AppError>;

    async fn create_invite(
        &self,
        organization_id: Uuid,
        code: &str,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<OrganizationInvite, AppError>;

    async fn get_invite_by_code(
        &self,
        code: &str,
    ) -> Result<Option<OrganizationInvite>, AppError>;

    /// Atomically delete the invite and insert the membership. Must fail
    /// with `InvalidInviteCode` if the invite is already gone and
    /// `AlreadyMember` on a duplicate membership.
    async fn consume_invite(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
    ) -> Result<OrganizationMember, AppError>;

    async fn list_active_invites(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrganizationInvite>, AppError>;
}

/// Scoped reads behind the chat responder. Every query is restricted to
/// organizations the user belongs to; `project_filter` additionally narrows
/// to an explicit project set (None = organization-wide, for admins).
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn projects_for_user(
        &self,
        user_id: Uuid,
        project_filter: Option<Vec<Uuid>>,
    ) -> Result<Vec<Project>, AppError>;

    async fn business_units_for_user(
        &self,
        user_id: Uuid,
        project_filter: Option<Vec<Uuid>>,
    ) -> Result<Vec<Project>, AppError>;

    async fn incidents_for_user(
        &self,
        user_id: Uuid,
        project_filter: Option<Vec<Uuid>>,
    ) -> Result<Vec<Incident>, AppError>;
}

/// Postgres-backed [MembershipStore] bundling the three repositories the
/// workflow touches.
#[derive(Clone)]
pub struct PgMembershipStore {
    pub organizations: OrganizationRepository,
    pub members: MemberRepository,
    pub invites: InviteRepository,
}

impl PgMembershipStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            organizations: OrganizationRepository::new(pool.clone()),
            members: MemberRepository::new(pool.clone()),
            invites: InviteRepository::new(pool),
        }
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        self.organizations.slug_exists(slug).await
    }

    async fn create_organization_with_owner(
        &self,
        name: &str,
        slug: &str,
        is_demo: bool,
        trial_ends_at: Option<DateTime<Utc>>,
        owner_id: Uuid,
    ) -> Result<Organization, AppError> {
        self.organizations
            .create_with_owner(name, slug, is_demo, trial_ends_at, owner_id)
            .await
    }

    async fn list_organizations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrganizationWithRole>, AppError> {
        self.organizations.list_for_user(user_id).await
    }

    async fn get_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>, AppError> {
        self.members.get(organization_id, user_id).await
    }

    async fn create_invite(
        &self,
        organization_id: Uuid,
        code: &str,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<OrganizationInvite, AppError> {
        self.invites
            .create(organization_id, code, created_by, expires_at)
            .await
    }

    async fn get_invite_by_code(
        &self,
        code: &str,
    ) -> Result<Option<OrganizationInvite>, AppError> {
        self.invites.get_by_code(code).await
    }

    async fn consume_invite(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
    ) -> Result<OrganizationMember, AppError> {
        self.invites.consume(invite_id, user_id).await
    }

    async fn list_active_invites(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrganizationInvite>, AppError> {
        self.invites.list_active(organization_id, now).await
    }
}

/// Postgres-backed [ChatStore].
#[derive(Clone)]
pub struct PgChatStore {
    pool: sqlx::PgPool,
}

impl PgChatStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn projects_of_type(
        &self,
        user_id: Uuid,
        project_filter: Option<Vec<Uuid>>,
        project_type: &str,
    ) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.organization_id, p.name, p.description, p.project_type,
                   p.code, p.status, p.location, p.parent_id, p.emissions_data,
                   p.created_at, p.updated_at, p.created_by, p.updated_by
            FROM projects p
            WHERE p.organization_id IN
                  (SELECT organization_id FROM organization_members WHERE user_id = $1)
              AND ($2::uuid[] IS NULL OR p.id = ANY($2))
              AND p.project_type = $3::project_type
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(&project_filter)
        .bind(project_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load projects for chat: {}", e);
            AppError::Internal("Failed to load projects".to_string())
        })?;

        Ok(projects)
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn projects_for_user(
        &self,
        user_id: Uuid,
        project_filter: Option<Vec<Uuid>>,
    ) -> Result<Vec<Project>, AppError> {
        self.projects_of_type(user_id, project_filter, "project").await
    }

    async fn business_units_for_user(
        &self,
        user_id: Uuid,
        project_filter: Option<Vec<Uuid>>,
    ) -> Result<Vec<Project>, AppError> {
        self.projects_of_type(user_id, project_filter, "business_unit")
            .await
    }

    async fn incidents_for_user(
        &self,
        user_id: Uuid,
        project_filter: Option<Vec<Uuid>>,
    ) -> Result<Vec<Incident>, AppError> {
        let incidents = sqlx::query_as::<_, Incident>(
            r#"
            SELECT i.id, i.project_id, i.organization_id, i.incident_type_id,
                   i.title, i.description, i.severity, i.status, i.location,
                   i.reported_at, i.resolved_at, i.closed_at, i.assigned_to,
                   i.created_at, i.updated_at
            FROM incidents i
            WHERE i.organization_id IN
                  (SELECT organization_id FROM organization_members WHERE user_id = $1)
              AND ($2::uuid[] IS NULL OR i.project_id = ANY($2))
            ORDER BY i.reported_at DESC
            "#,
        )
        .bind(user_id)
        .bind(&project_filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load incidents for chat: {}", e);
            AppError::Internal("Failed to load incidents".to_string())
        })?;

        Ok(incidents)
    }
}
