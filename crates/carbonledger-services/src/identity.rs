//! Identity-provider code exchange.
//!
//! The browser lands on `/auth/callback?code=...` after the OAuth/PKCE flow;
//! this service exchanges the code for the authenticated user. The exchange
//! races a short timeout so a hung provider surfaces as a distinct login
//! failure rather than a stalled request.

use std::time::Duration;

use async_trait::async_trait;
use carbonledger_core::AppError;
use serde::Deserialize;
use uuid::Uuid;

/// Identity of a signed-in user as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
}

/// Exchanges an authorization code for a user identity. Implemented over
/// HTTP in production and by doubles in tests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<AuthenticatedUser, AppError>;
}

#[derive(Clone)]
pub struct HttpIdentityProvider {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: AuthenticatedUser,
}

impl HttpIdentityProvider {
    pub fn new(base_url: String, timeout_seconds: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1) * 2))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url,
            timeout: Duration::from_secs(timeout_seconds.max(1)),
            client,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/token?grant_type=pkce", self.base_url.trim_end_matches('/'))
    }

    async fn do_exchange(&self, code: &str) -> Result<AuthenticatedUser, AppError> {
        let response = self
            .client
            .post(self.token_url())
            .json(&serde_json::json!({ "auth_code": code }))
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Code exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(status = %status, "Identity provider rejected code exchange");
            return Err(AppError::Identity(format!(
                "Code exchange failed with status {}",
                status
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("Invalid token response: {}", e)))?;

        Ok(parsed.user)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    /// Race the exchange against the configured timeout; timing out is a
    /// distinct, user-reportable failure.
    async fn exchange_code(&self, code: &str) -> Result<AuthenticatedUser, AppError> {
        match tokio::time::timeout(self.timeout, self.do_exchange(code)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Identity code exchange timed out");
                Err(AppError::LoginTimeout)
            }
        }
    }
}
