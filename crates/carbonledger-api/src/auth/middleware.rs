//! Bearer-token authentication middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{verify_session_token, SessionUser};
use crate::error::HttpAppError;
use carbonledger_core::AppError;

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    let claims = match verify_session_token(&auth_state.jwt_secret, token) {
        Ok(claims) => claims,
        Err(err) => return HttpAppError(err).into_response(),
    };

    request.extensions_mut().insert(SessionUser {
        user_id: claims.sub,
        email: claims.email,
    });

    next.run(request).await
}
