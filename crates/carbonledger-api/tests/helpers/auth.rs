//! Authentication helpers for integration tests.

use carbonledger_api::auth::issue_session_token;
use uuid::Uuid;

use super::TEST_JWT_SECRET;

/// A signed-in test user: id, email, and a bearer token for requests.
pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

/// Create a user identity with a profile row and a valid session token.
pub async fn register_test_user(pool: &sqlx::PgPool, email: &str) -> TestUser {
    let user_id = Uuid::new_v4();

    sqlx::query("INSERT INTO profiles (id, email) VALUES ($1, $2)")
        .bind(user_id)
        .bind(email)
        .execute(pool)
        .await
        .expect("Failed to insert test profile");

    let token = issue_session_token(TEST_JWT_SECRET, user_id, email, 24)
        .expect("Failed to issue test session token");

    TestUser {
        user_id,
        email: email.to_string(),
        token,
    }
}

/// Authorization header value for a test user.
pub fn bearer(user: &TestUser) -> String {
    format!("Bearer {}", user.token)
}
