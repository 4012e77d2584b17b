//! Route configuration and setup.

use axum::{
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use carbonledger_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState {
        jwt_secret: config.jwt_secret.clone(),
    });

    let public_routes = public_routes();
    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        auth_state,
        auth_middleware,
    ));

    let app = public_routes
        .merge(protected_routes)
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/openapi.json", get(openapi_spec))
        .route("/auth/callback", get(handlers::auth_callback::auth_callback))
        .route("/api/setup-demo", post(handlers::demo::setup_demo))
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        // AI endpoints
        .route("/api/ai-analysis", post(handlers::ai::analyze_emissions))
        .route("/api/predict-emissions", post(handlers::ai::predict_emissions))
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/invite-user", post(handlers::projects::invite_user))
        // Profile
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
        // Invites (redemption is organization-independent)
        .route("/api/invites/redeem", post(handlers::invites::redeem_invite))
        // Organizations
        .route(
            "/api/organizations",
            get(handlers::organizations::list_organizations)
                .post(handlers::organizations::create_organization),
        )
        .route(
            "/api/organizations/{organization_id}",
            get(handlers::organizations::get_organization)
                .put(handlers::organizations::update_organization)
                .delete(handlers::organizations::delete_organization),
        )
        .route(
            "/api/organizations/{organization_id}/billing",
            get(handlers::billing::get_subscription),
        )
        // Members
        .route(
            "/api/organizations/{organization_id}/members",
            get(handlers::members::list_members),
        )
        .route(
            "/api/organizations/{organization_id}/members/{member_user_id}",
            patch(handlers::members::update_member_role).delete(handlers::members::remove_member),
        )
        // Organization invites
        .route(
            "/api/organizations/{organization_id}/invites",
            get(handlers::invites::list_invites).post(handlers::invites::create_invite),
        )
        .route(
            "/api/organizations/{organization_id}/invites/{invite_id}",
            delete(handlers::invites::delete_invite),
        )
        // Projects and business units
        .route(
            "/api/organizations/{organization_id}/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/api/organizations/{organization_id}/projects/{project_id}",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/api/organizations/{organization_id}/projects/{project_id}/emissions",
            put(handlers::projects::update_project_emissions),
        )
        .route(
            "/api/organizations/{organization_id}/projects/{project_id}/members",
            get(handlers::projects::list_project_members)
                .post(handlers::projects::add_project_member),
        )
        .route(
            "/api/organizations/{organization_id}/projects/{project_id}/members/{member_user_id}",
            delete(handlers::projects::remove_project_member),
        )
        .route(
            "/api/organizations/{organization_id}/projects/{project_id}/invites",
            get(handlers::projects::list_project_invites),
        )
        // Uploads
        .route(
            "/api/organizations/{organization_id}/projects/{project_id}/uploads",
            get(handlers::uploads::list_uploads).post(handlers::uploads::create_upload),
        )
        .route(
            "/api/organizations/{organization_id}/projects/{project_id}/uploads/{upload_id}",
            patch(handlers::uploads::update_upload_status),
        )
        // Materials
        .route(
            "/api/organizations/{organization_id}/materials",
            get(handlers::materials::list_materials).post(handlers::materials::create_material),
        )
        .route(
            "/api/organizations/{organization_id}/materials/{material_id}",
            get(handlers::materials::get_material)
                .put(handlers::materials::update_material)
                .delete(handlers::materials::delete_material),
        )
        // Incidents
        .route(
            "/api/organizations/{organization_id}/incidents",
            get(handlers::incidents::list_incidents).post(handlers::incidents::create_incident),
        )
        .route(
            "/api/organizations/{organization_id}/incidents/{incident_id}",
            get(handlers::incidents::get_incident).put(handlers::incidents::update_incident),
        )
        .route(
            "/api/organizations/{organization_id}/incidents/{incident_id}/status",
            post(handlers::incidents::transition_incident),
        )
        .route(
            "/api/organizations/{organization_id}/incidents/{incident_id}/comments",
            get(handlers::incidents::list_comments).post(handlers::incidents::add_comment),
        )
        .route(
            "/api/organizations/{organization_id}/incidents/{incident_id}/audit-logs",
            get(handlers::incidents::list_audit_logs),
        )
        .route(
            "/api/organizations/{organization_id}/incidents/{incident_id}/predictions",
            get(handlers::incidents::list_predictions)
                .post(handlers::incidents::create_prediction),
        )
        // Incident types
        .route(
            "/api/organizations/{organization_id}/incident-types",
            get(handlers::incidents::list_incident_types)
                .post(handlers::incidents::create_incident_type),
        )
        .route(
            "/api/organizations/{organization_id}/incident-types/{incident_type_id}",
            patch(handlers::incidents::set_incident_type_active),
        )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn openapi_spec() -> impl IntoResponse {
    Json(crate::api_doc::openapi_spec())
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.map_err(|_| anyhow::anyhow!("Invalid CORS origin"))?)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
    };
    Ok(cors)
}
