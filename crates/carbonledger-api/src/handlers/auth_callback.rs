use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::issue_session_token;
use crate::state::AppState;
use carbonledger_core::AppError;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// OAuth/PKCE callback. Exchanges the code (racing a short timeout), ensures
/// a profile row, creates a personal demo organization for first-time users,
/// and redirects to the dashboard - or back to the login page with an error
/// reason in the URL.
#[tracing::instrument(skip(state, query))]
pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let site = state.config.site_url.trim_end_matches('/').to_string();

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return login_redirect(&site, "missing_code");
    };

    let user = match state.services.identity.exchange_code(&code).await {
        Ok(user) => user,
        Err(AppError::LoginTimeout) => {
            return login_redirect(&site, "login_timeout");
        }
        Err(err) => {
            tracing::warn!(error = %err, "Auth code exchange failed");
            return login_redirect(&site, "exchange_failed");
        }
    };

    if let Err(err) = state
        .db
        .profile_repository
        .ensure(user.id, &user.email)
        .await
    {
        tracing::error!(error = %err, "Failed to ensure profile after sign-in");
        return login_redirect(&site, "profile_error");
    }

    // First sign-in: no memberships yet, so provision a personal demo
    // organization and greet the user.
    let mut welcome = false;
    match state
        .services
        .membership
        .list_organizations_for_user(user.id)
        .await
    {
        Ok(orgs) if orgs.is_empty() => {
            let name = personal_org_name(&user.email);
            match state
                .services
                .membership
                .create_demo_organization(&name, user.id, Utc::now())
                .await
            {
                Ok(_) => welcome = true,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to create personal organization");
                    return login_redirect(&site, "onboarding_error");
                }
            }
        }
        Ok(_) => {}
        Err(err) => {
            tracing::error!(error = %err, "Failed to load memberships after sign-in");
            return login_redirect(&site, "profile_error");
        }
    }

    let token = match issue_session_token(
        &state.config.jwt_secret,
        user.id,
        &user.email,
        state.config.jwt_expiry_hours,
    ) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "Failed to issue session token");
            return login_redirect(&site, "session_error");
        }
    };

    let destination = if welcome {
        format!("{site}/dashboard?welcome=true")
    } else {
        format!("{site}/dashboard")
    };

    let cookie = format!(
        "cl_session={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.jwt_expiry_hours * 3600
    );

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, destination),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response()
}

fn login_redirect(site: &str, reason: &str) -> Response {
    let location = format!("{site}/login?error={}", urlencoding::encode(reason));
    (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
}

/// "jane.doe@example.com" -> "jane.doe's Workspace"
fn personal_org_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("My");
    format!("{local}'s Workspace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_org_name() {
        assert_eq!(
            personal_org_name("jane.doe@example.com"),
            "jane.doe's Workspace"
        );
        assert_eq!(personal_org_name("bad-email"), "bad-email's Workspace");
    }
}
