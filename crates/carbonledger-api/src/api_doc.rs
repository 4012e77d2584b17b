//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use carbonledger_core::models;

/// Returns the OpenAPI spec.
pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CarbonLedger API",
        version = "0.1.0",
        description = "Multi-tenant carbon emissions tracking API: organizations, \
                       projects and business units, emission-factor materials, \
                       incident tracking, uploads, and AI-assisted analysis."
    ),
    paths(
        handlers::organizations::list_organizations,
        handlers::organizations::create_organization,
        handlers::invites::create_invite,
        handlers::invites::redeem_invite,
        handlers::projects::invite_user,
        handlers::incidents::create_incident,
        handlers::incidents::transition_incident,
        handlers::ai::analyze_emissions,
        handlers::ai::predict_emissions,
        handlers::chat::chat,
        handlers::demo::setup_demo,
    ),
    components(schemas(
        error::ErrorResponse,
        models::Organization,
        models::OrganizationMember,
        models::OrganizationInvite,
        models::Project,
        models::ProjectMember,
        models::ProjectInvite,
        models::EmissionsData,
        models::Material,
        models::Incident,
        models::IncidentType,
        models::IncidentComment,
        models::IncidentAuditLog,
        models::Upload,
        models::Profile,
        models::Subscription,
    )),
    tags(
        (name = "organizations", description = "Organization and membership management"),
        (name = "invites", description = "Invite codes and project invitations"),
        (name = "incidents", description = "Incident tracking"),
        (name = "ai", description = "AI-assisted analysis, prediction, and chat"),
        (name = "development", description = "Development-only helpers")
    )
)]
pub struct ApiDoc;
