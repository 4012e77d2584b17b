//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only what
//! they need via Axum's `FromRef`, and to avoid a single god object with
//! duplicate repositories.

use std::sync::Arc;

use carbonledger_core::Config;
use carbonledger_db::{
    IncidentRepository, IncidentTypeRepository, InviteRepository, MaterialRepository,
    MemberRepository, OrganizationRepository, ProfileRepository, ProjectRepository,
    SubscriptionRepository, UploadRepository,
};
use carbonledger_services::{AnalysisService, ChatService, IdentityProvider, MembershipService};
use sqlx::PgPool;

// ----- Sub-state types -----

/// Database pool and the repositories handlers use directly.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub organization_repository: OrganizationRepository,
    pub member_repository: MemberRepository,
    pub invite_repository: InviteRepository,
    pub project_repository: ProjectRepository,
    pub material_repository: MaterialRepository,
    pub incident_repository: IncidentRepository,
    pub incident_type_repository: IncidentTypeRepository,
    pub upload_repository: UploadRepository,
    pub profile_repository: ProfileRepository,
    pub subscription_repository: SubscriptionRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            organization_repository: OrganizationRepository::new(pool.clone()),
            member_repository: MemberRepository::new(pool.clone()),
            invite_repository: InviteRepository::new(pool.clone()),
            project_repository: ProjectRepository::new(pool.clone()),
            material_repository: MaterialRepository::new(pool.clone()),
            incident_repository: IncidentRepository::new(pool.clone()),
            incident_type_repository: IncidentTypeRepository::new(pool.clone()),
            upload_repository: UploadRepository::new(pool.clone()),
            profile_repository: ProfileRepository::new(pool.clone()),
            subscription_repository: SubscriptionRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Workflow and integration services.
#[derive(Clone)]
pub struct ServiceState {
    pub membership: MembershipService,
    /// None when no AI API key is configured; the AI endpoints then fail
    /// with a service error instead of a panic.
    pub analysis: Option<AnalysisService>,
    pub chat: ChatService,
    pub identity: Arc<dyn IdentityProvider>,
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub services: ServiceState,
    pub config: Config,
    pub is_production: bool,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ServiceState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.services.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
