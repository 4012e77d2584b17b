//! Session authentication.
//!
//! Sessions are HS256 JWTs issued after the identity-provider code exchange
//! (or by the development demo-setup endpoint) and presented as bearer
//! tokens. The middleware verifies the token and stores a [SessionUser] in
//! request extensions for handlers to extract.

pub mod middleware;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorResponse;
use carbonledger_core::AppError;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid, // user_id
    pub email: String,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

/// Authenticated caller, extracted from the verified session token and
/// stored in request extensions.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Issue a session token for an authenticated user.
pub fn issue_session_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user_id,
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to issue session token: {}", e)))
}

/// Verify a session token and return its claims. Expiry is validated.
pub fn verify_session_token(secret: &str, token: &str) -> Result<SessionClaims, AppError> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid session token: {}", e)))
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Missing session".to_string(),
                        details: None,
                        error_type: None,
                        code: "UNAUTHORIZED".to_string(),
                        recoverable: false,
                        suggested_action: Some("Sign in and retry".to_string()),
                    }),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    #[test]
    fn test_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_session_token(SECRET, user_id, "user@example.com", 24).unwrap();
        let claims = verify_session_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "user@example.com");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_session_token(SECRET, Uuid::new_v4(), "user@example.com", 24).unwrap();
        let err = verify_session_token("another-secret-another-secret-12", &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_session_token(SECRET, Uuid::new_v4(), "user@example.com", -1).unwrap();
        let err = verify_session_token(SECRET, &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
