//! Service and repository wiring.

use std::sync::Arc;

use anyhow::Result;
use carbonledger_core::Config;
use carbonledger_db::stores::{PgChatStore, PgMembershipStore};
use carbonledger_services::{
    AnalysisService, AnthropicCompletion, ChatService, HttpIdentityProvider, MembershipService,
};
use sqlx::PgPool;

use crate::state::{AppState, DbState, ServiceState};

/// Construct every repository and service once at process start and thread
/// them through the application state.
pub fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let db = DbState::new(pool.clone());

    let membership = MembershipService::new(
        Arc::new(PgMembershipStore::new(pool.clone())),
        config.invite_expiry_days,
        config.demo_trial_days,
    );

    let chat = ChatService::new(Arc::new(PgChatStore::new(pool)));

    let analysis = match &config.anthropic_api_key {
        Some(api_key) => Some(AnalysisService::new(Arc::new(AnthropicCompletion::new(
            api_key.clone(),
            config.anthropic_model.clone(),
        )))),
        None => {
            tracing::warn!("ANTHROPIC_API_KEY not set; AI analysis endpoints are disabled");
            None
        }
    };

    let identity = Arc::new(HttpIdentityProvider::new(
        config.identity_base_url.clone(),
        config.login_timeout_seconds,
    ));

    let state = AppState {
        db,
        services: ServiceState {
            membership,
            analysis,
            chat,
            identity,
        },
        config: config.clone(),
        is_production: config.is_production(),
    };

    Ok(Arc::new(state))
}
