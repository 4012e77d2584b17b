//! Membership and invitation workflow.
//!
//! Organization creation, invite-code issuance and redemption, and the role
//! checks that gate them. All mutations fail loud; the only multi-row writes
//! (organization creation, invite consumption) are atomic in the store.

use std::sync::Arc;

use carbonledger_core::models::{
    Organization, OrganizationInvite, OrganizationMember, OrganizationWithRole,
};
use carbonledger_core::{slug, AppError, Role};
use carbonledger_db::MembershipStore;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

const INVITE_CODE_LEN: usize = 8;
const INVITE_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
// Bounded retries for randomly generated identifiers that race a unique
// constraint (slug suffix, invite code).
const GENERATION_ATTEMPTS: u32 = 5;

/// Result of organization creation. `slug_adjusted` tells the caller the
/// requested name collided and a suffixed slug was used instead.
#[derive(Debug, Clone)]
pub struct CreatedOrganization {
    pub organization: Organization,
    pub slug_adjusted: bool,
}

#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn MembershipStore>,
    invite_expiry: Duration,
    demo_trial: Duration,
}

impl MembershipService {
    pub fn new(
        store: Arc<dyn MembershipStore>,
        invite_expiry_days: i64,
        demo_trial_days: i64,
    ) -> Self {
        Self {
            store,
            invite_expiry: Duration::days(invite_expiry_days),
            demo_trial: Duration::days(demo_trial_days),
        }
    }

    /// Create an organization owned by `owner_id`. The slug is derived from
    /// the name; on collision a random three-digit suffix is appended and
    /// reported back. The insert runs under a unique constraint, so a lost
    /// race just triggers another suffix attempt.
    pub async fn create_organization(
        &self,
        name: &str,
        owner_id: Uuid,
    ) -> Result<CreatedOrganization, AppError> {
        self.create_organization_inner(name, owner_id, false, None)
            .await
    }

    /// Create a personal demo organization with a trial window, used when a
    /// first-time user signs in without any memberships.
    pub async fn create_demo_organization(
        &self,
        name: &str,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CreatedOrganization, AppError> {
        self.create_organization_inner(name, owner_id, true, Some(now + self.demo_trial))
            .await
    }

    async fn create_organization_inner(
        &self,
        name: &str,
        owner_id: Uuid,
        is_demo: bool,
        trial_ends_at: Option<DateTime<Utc>>,
    ) -> Result<CreatedOrganization, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "Organization name must not be empty".to_string(),
            ));
        }
        let base = slug::slugify(name);
        if base.is_empty() {
            return Err(AppError::InvalidInput(
                "Organization name must contain at least one letter or digit".to_string(),
            ));
        }

        let mut candidate = base.clone();
        let mut adjusted = false;
        if self.store.slug_exists(&candidate).await? {
            candidate = slug::with_suffix(&base, random_suffix());
            adjusted = true;
        }

        let mut attempts = 0;
        loop {
            match self
                .store
                .create_organization_with_owner(name, &candidate, is_demo, trial_ends_at, owner_id)
                .await
            {
                Ok(organization) => {
                    return Ok(CreatedOrganization {
                        organization,
                        slug_adjusted: adjusted,
                    })
                }
                Err(AppError::DuplicateSlug { .. }) if attempts < GENERATION_ATTEMPTS => {
                    attempts += 1;
                    candidate = slug::with_suffix(&base, random_suffix());
                    adjusted = true;
                    tracing::warn!(
                        slug = %candidate,
                        attempt = attempts,
                        "Slug collision, retrying with new suffix"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Organizations the user belongs to. An empty list is the normal state
    /// for a new user and routes them to onboarding.
    pub async fn list_organizations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrganizationWithRole>, AppError> {
        self.store.list_organizations_for_user(user_id).await
    }

    /// Issue an invite code for an organization. Restricted to owners and
    /// admins.
    pub async fn generate_invite(
        &self,
        organization_id: Uuid,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OrganizationInvite, AppError> {
        self.require_manager(organization_id, created_by).await?;

        let expires_at = now + self.invite_expiry;
        let mut attempts = 0;
        loop {
            let code = generate_invite_code();
            match self
                .store
                .create_invite(organization_id, &code, created_by, expires_at)
                .await
            {
                Ok(invite) => return Ok(invite),
                Err(AppError::InvalidInput(_)) if attempts < GENERATION_ATTEMPTS => {
                    // Code collision; regenerate.
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Redeem an invite code. Expired or unknown codes are invalid; a code
    /// is single-use, so a second redemption fails the lookup.
    pub async fn redeem_invite(
        &self,
        code: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OrganizationMember, AppError> {
        let code = code.trim().to_uppercase();
        let invite = self
            .store
            .get_invite_by_code(&code)
            .await?
            .ok_or(AppError::InvalidInviteCode)?;

        if invite.is_expired(now) {
            tracing::warn!(invite_id = %invite.id, "Rejected expired invite code");
            return Err(AppError::InvalidInviteCode);
        }

        if self
            .store
            .get_member(invite.organization_id, user_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyMember);
        }

        self.store.consume_invite(invite.id, user_id).await
    }

    /// Unexpired invites for an organization. Restricted to owners and
    /// admins.
    pub async fn list_active_invites(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrganizationInvite>, AppError> {
        self.require_manager(organization_id, user_id).await?;
        self.store.list_active_invites(organization_id, now).await
    }

    /// The caller's role in an organization, or NotFound when they are not a
    /// member (a scoped miss never reads as forbidden).
    pub async fn member_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Role, AppError> {
        self.store
            .get_member(organization_id, user_id)
            .await?
            .map(|m| m.role)
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
    }

    async fn require_manager(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        let role = self.member_role(organization_id, user_id).await?;
        if !role.can_manage_members() {
            return Err(AppError::Forbidden(
                "Only owners and admins may manage invites".to_string(),
            ));
        }
        Ok(())
    }
}

fn random_suffix() -> u32 {
    rand::rng().random_range(0..1000)
}

/// 8-character uppercase alphanumeric invite code. Uniqueness is enforced by
/// the store's constraint, not by the generator.
fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..INVITE_CODE_CHARSET.len());
            INVITE_CODE_CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store double mirroring the constraints the real schema
    /// enforces: unique slugs, unique invite codes, unique (org, user)
    /// memberships, and atomic invite consumption.
    #[derive(Default)]
    struct InMemoryStore {
        inner: Mutex<StoreState>,
    }

    #[derive(Default)]
    struct StoreState {
        organizations: HashMap<Uuid, Organization>,
        members: Vec<OrganizationMember>,
        invites: HashMap<Uuid, OrganizationInvite>,
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[async_trait]
    impl MembershipStore for InMemoryStore {
        async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
            let state = self.inner.lock().unwrap();
            Ok(state.organizations.values().any(|o| o.slug == slug))
        }

        async fn create_organization_with_owner(
            &self,
            name: &str,
            slug: &str,
            is_demo: bool,
            trial_ends_at: Option<DateTime<Utc>>,
            owner_id: Uuid,
        ) -> Result<Organization, AppError> {
            let mut state = self.inner.lock().unwrap();
            if state.organizations.values().any(|o| o.slug == slug) {
                return Err(AppError::DuplicateSlug {
                    name: name.to_string(),
                    slug: slug.to_string(),
                });
            }
            let organization = Organization {
                id: Uuid::new_v4(),
                name: name.to_string(),
                slug: slug.to_string(),
                is_demo,
                trial_ends_at,
                created_at: now(),
                updated_at: now(),
            };
            state.organizations.insert(organization.id, organization.clone());
            state.members.push(OrganizationMember {
                id: Uuid::new_v4(),
                organization_id: organization.id,
                user_id: owner_id,
                role: Role::Owner,
                created_at: now(),
                updated_at: now(),
            });
            Ok(organization)
        }

        async fn list_organizations_for_user(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<OrganizationWithRole>, AppError> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .members
                .iter()
                .filter(|m| m.user_id == user_id)
                .filter_map(|m| {
                    state.organizations.get(&m.organization_id).map(|o| {
                        OrganizationWithRole {
                            id: o.id,
                            name: o.name.clone(),
                            slug: o.slug.clone(),
                            is_demo: o.is_demo,
                            trial_ends_at: o.trial_ends_at,
                            role: m.role,
                            created_at: o.created_at,
                            updated_at: o.updated_at,
                        }
                    })
                })
                .collect())
        }

        async fn get_member(
            &self,
            organization_id: Uuid,
            user_id: Uuid,
        ) -> Result<Option<OrganizationMember>, AppError> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .members
                .iter()
                .find(|m| m.organization_id == organization_id && m.user_id == user_id)
                .cloned())
        }

        async fn create_invite(
            &self,
            organization_id: Uuid,
            code: &str,
            created_by: Uuid,
            expires_at: DateTime<Utc>,
        ) -> Result<OrganizationInvite, AppError> {
            let mut state = self.inner.lock().unwrap();
            if state.invites.values().any(|i| i.code == code) {
                return Err(AppError::InvalidInput("Invite code collision".to_string()));
            }
            let invite = OrganizationInvite {
                id: Uuid::new_v4(),
                organization_id,
                code: code.to_string(),
                created_by,
                expires_at,
                created_at: now(),
                updated_at: now(),
            };
            state.invites.insert(invite.id, invite.clone());
            Ok(invite)
        }

        async fn get_invite_by_code(
            &self,
            code: &str,
        ) -> Result<Option<OrganizationInvite>, AppError> {
            let state = self.inner.lock().unwrap();
            Ok(state.invites.values().find(|i| i.code == code).cloned())
        }

        async fn consume_invite(
            &self,
            invite_id: Uuid,
            user_id: Uuid,
        ) -> Result<OrganizationMember, AppError> {
            let mut state = self.inner.lock().unwrap();
            let invite = state
                .invites
                .remove(&invite_id)
                .ok_or(AppError::InvalidInviteCode)?;
            if state
                .members
                .iter()
                .any(|m| m.organization_id == invite.organization_id && m.user_id == user_id)
            {
                return Err(AppError::AlreadyMember);
            }
            let member = OrganizationMember {
                id: Uuid::new_v4(),
                organization_id: invite.organization_id,
                user_id,
                role: Role::Member,
                created_at: now(),
                updated_at: now(),
            };
            state.members.push(member.clone());
            Ok(member)
        }

        async fn list_active_invites(
            &self,
            organization_id: Uuid,
            now: DateTime<Utc>,
        ) -> Result<Vec<OrganizationInvite>, AppError> {
            let state = self.inner.lock().unwrap();
            Ok(state
                .invites
                .values()
                .filter(|i| i.organization_id == organization_id && i.expires_at > now)
                .cloned()
                .collect())
        }
    }

    fn service() -> (MembershipService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        (MembershipService::new(store.clone(), 7, 14), store)
    }

    #[tokio::test]
    async fn test_create_organization_derives_slug() {
        let (svc, _) = service();
        let created = svc
            .create_organization("Acme Corp", Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(created.organization.slug, "acme-corp");
        assert!(!created.slug_adjusted);
    }

    #[tokio::test]
    async fn test_duplicate_name_gets_suffixed_slug() {
        let (svc, _) = service();
        let first = svc
            .create_organization("Acme Corp", Uuid::new_v4())
            .await
            .unwrap();
        let second = svc
            .create_organization("Acme Corp", Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(first.organization.slug, "acme-corp");
        assert!(second.slug_adjusted);
        assert_ne!(second.organization.slug, first.organization.slug);
        assert!(second.organization.slug.starts_with("acme-corp-"));
        // Three-digit random suffix
        let suffix = second
            .organization
            .slug
            .rsplit('-')
            .next()
            .unwrap();
        assert_eq!(suffix.len(), 3);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_creator_becomes_owner() {
        let (svc, _) = service();
        let owner = Uuid::new_v4();
        svc.create_organization("Acme Corp", owner).await.unwrap();

        let orgs = svc.list_organizations_for_user(owner).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].role, Role::Owner);
    }

    #[tokio::test]
    async fn test_list_organizations_empty_for_new_user() {
        let (svc, _) = service();
        let orgs = svc
            .list_organizations_for_user(Uuid::new_v4())
            .await
            .unwrap();
        assert!(orgs.is_empty());
    }

    #[tokio::test]
    async fn test_invite_lifecycle() {
        let (svc, _) = service();
        let owner = Uuid::new_v4();
        let org = svc
            .create_organization("Acme Corp", owner)
            .await
            .unwrap()
            .organization;

        let invite = svc.generate_invite(org.id, owner, Utc::now()).await.unwrap();
        assert_eq!(invite.code.len(), 8);
        assert!(invite
            .code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        let joiner = Uuid::new_v4();
        let member = svc
            .redeem_invite(&invite.code, joiner, Utc::now())
            .await
            .unwrap();
        assert_eq!(member.role, Role::Member);

        // Redeemed invite is consumed: the member sees the org, the invite
        // list is empty, and a second redemption is rejected.
        let orgs = svc.list_organizations_for_user(joiner).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].role, Role::Member);

        let invites = svc
            .list_active_invites(org.id, owner, Utc::now())
            .await
            .unwrap();
        assert!(invites.is_empty());

        let err = svc
            .redeem_invite(&invite.code, Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInviteCode));
    }

    #[tokio::test]
    async fn test_expired_invite_rejected_even_if_stored() {
        let (svc, store) = service();
        let owner = Uuid::new_v4();
        let org = svc
            .create_organization("Acme Corp", owner)
            .await
            .unwrap()
            .organization;

        // Insert an already-expired invite directly into the store.
        let expired = store
            .create_invite(org.id, "OLDCODE1", owner, Utc::now() - Duration::days(1))
            .await
            .unwrap();

        let err = svc
            .redeem_invite(&expired.code, Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInviteCode));
        // Still present in storage; rejection is based on expiry, not absence.
        assert!(store
            .get_invite_by_code("OLDCODE1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_redeem_rejects_existing_member() {
        let (svc, _) = service();
        let owner = Uuid::new_v4();
        let org = svc
            .create_organization("Acme Corp", owner)
            .await
            .unwrap()
            .organization;

        let invite = svc.generate_invite(org.id, owner, Utc::now()).await.unwrap();
        let err = svc
            .redeem_invite(&invite.code, owner, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyMember));
    }

    #[tokio::test]
    async fn test_member_cannot_generate_invites() {
        let (svc, _) = service();
        let owner = Uuid::new_v4();
        let org = svc
            .create_organization("Acme Corp", owner)
            .await
            .unwrap()
            .organization;

        let invite = svc.generate_invite(org.id, owner, Utc::now()).await.unwrap();
        let member_user = Uuid::new_v4();
        svc.redeem_invite(&invite.code, member_user, Utc::now())
            .await
            .unwrap();

        let err = svc
            .generate_invite(org.id, member_user, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_outsider_sees_not_found_not_forbidden() {
        let (svc, _) = service();
        let org = svc
            .create_organization("Acme Corp", Uuid::new_v4())
            .await
            .unwrap()
            .organization;

        let err = svc
            .generate_invite(org.id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_demo_organization_has_trial_window() {
        let (svc, _) = service();
        let start = Utc::now();
        let created = svc
            .create_demo_organization("Personal Workspace", Uuid::new_v4(), start)
            .await
            .unwrap();
        assert!(created.organization.is_demo);
        assert_eq!(
            created.organization.trial_ends_at,
            Some(start + Duration::days(14))
        );
    }
}
