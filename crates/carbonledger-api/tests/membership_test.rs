mod helpers;

use helpers::auth::{bearer, register_test_user};
use helpers::setup_test_app;

/// Scenario: creating "Acme Corp" twice yields distinct slugs, the second
/// with a random three-digit suffix.
#[tokio::test]
async fn test_duplicate_organization_name_gets_suffixed_slug() {
    let app = setup_test_app().await;
    let client = app.client();

    let alice = register_test_user(app.pool(), "alice@example.com").await;
    let bob = register_test_user(app.pool(), "bob@example.com").await;

    let first = client
        .post("/api/organizations")
        .add_header("Authorization", bearer(&alice))
        .json(&serde_json::json!({ "name": "Acme Corp" }))
        .await;
    first.assert_status(axum::http::StatusCode::CREATED);
    let first_body: serde_json::Value = first.json();
    assert_eq!(first_body["organization"]["slug"], "acme-corp");
    assert_eq!(first_body["slug_adjusted"], false);

    let second = client
        .post("/api/organizations")
        .add_header("Authorization", bearer(&bob))
        .json(&serde_json::json!({ "name": "Acme Corp" }))
        .await;
    second.assert_status(axum::http::StatusCode::CREATED);
    let second_body: serde_json::Value = second.json();
    let second_slug = second_body["organization"]["slug"].as_str().unwrap();

    assert_ne!(second_slug, "acme-corp");
    assert!(second_slug.starts_with("acme-corp-"));
    let suffix = second_slug.rsplit('-').next().unwrap();
    assert_eq!(suffix.len(), 3);
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(second_body["slug_adjusted"], true);
}

/// A fresh user has no organizations; the listing is empty, not an error,
/// and flags onboarding.
#[tokio::test]
async fn test_new_user_has_empty_organization_list() {
    let app = setup_test_app().await;
    let client = app.client();

    let user = register_test_user(app.pool(), "newbie@example.com").await;

    let response = client
        .get("/api/organizations")
        .add_header("Authorization", bearer(&user))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["count"], 0);
    assert_eq!(body["onboarding"], true);
    assert!(body["organizations"].as_array().unwrap().is_empty());
}

/// Scenario: generate an invite code, redeem it as another user. They show
/// up as a member; the invite disappears from the active list; a second
/// redemption fails with "invalid code".
#[tokio::test]
async fn test_invite_redemption_lifecycle() {
    let app = setup_test_app().await;
    let client = app.client();

    let owner = register_test_user(app.pool(), "owner@example.com").await;
    let joiner = register_test_user(app.pool(), "joiner@example.com").await;
    let third = register_test_user(app.pool(), "third@example.com").await;

    let org = client
        .post("/api/organizations")
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({ "name": "Invite Co" }))
        .await;
    org.assert_status(axum::http::StatusCode::CREATED);
    let org_id = org.json::<serde_json::Value>()["organization"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let invite = client
        .post(&format!("/api/organizations/{org_id}/invites"))
        .add_header("Authorization", bearer(&owner))
        .await;
    invite.assert_status(axum::http::StatusCode::CREATED);
    let invite_body: serde_json::Value = invite.json();
    let code = invite_body["invite"]["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);

    let redeem = client
        .post("/api/invites/redeem")
        .add_header("Authorization", bearer(&joiner))
        .json(&serde_json::json!({ "code": code }))
        .await;
    redeem.assert_status_ok();
    let membership: serde_json::Value = redeem.json();
    assert_eq!(membership["membership"]["role"], "member");

    // The joiner now sees the organization with role "member".
    let orgs = client
        .get("/api/organizations")
        .add_header("Authorization", bearer(&joiner))
        .await;
    let orgs_body: serde_json::Value = orgs.json();
    assert_eq!(orgs_body["count"], 1);
    assert_eq!(orgs_body["organizations"][0]["role"], "member");

    // The invite no longer appears in the active list.
    let invites = client
        .get(&format!("/api/organizations/{org_id}/invites"))
        .add_header("Authorization", bearer(&owner))
        .await;
    invites.assert_status_ok();
    assert_eq!(invites.json::<serde_json::Value>()["count"], 0);

    // Single use: a second redemption fails as an invalid code.
    let again = client
        .post("/api/invites/redeem")
        .add_header("Authorization", bearer(&third))
        .json(&serde_json::json!({ "code": code }))
        .await;
    again.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let err: serde_json::Value = again.json();
    assert_eq!(err["code"], "INVALID_INVITE_CODE");
}

/// Plain members cannot issue invites; non-members cannot even see the
/// organization.
#[tokio::test]
async fn test_invite_issuance_is_role_gated() {
    let app = setup_test_app().await;
    let client = app.client();

    let owner = register_test_user(app.pool(), "owner@example.com").await;
    let member = register_test_user(app.pool(), "member@example.com").await;
    let outsider = register_test_user(app.pool(), "outsider@example.com").await;

    let org = client
        .post("/api/organizations")
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({ "name": "Gated Org" }))
        .await;
    let org_id = org.json::<serde_json::Value>()["organization"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let invite = client
        .post(&format!("/api/organizations/{org_id}/invites"))
        .add_header("Authorization", bearer(&owner))
        .await;
    let code = invite.json::<serde_json::Value>()["invite"]["code"]
        .as_str()
        .unwrap()
        .to_string();
    client
        .post("/api/invites/redeem")
        .add_header("Authorization", bearer(&member))
        .json(&serde_json::json!({ "code": code }))
        .await
        .assert_status_ok();

    // A plain member is forbidden.
    let forbidden = client
        .post(&format!("/api/organizations/{org_id}/invites"))
        .add_header("Authorization", bearer(&member))
        .await;
    forbidden.assert_status(axum::http::StatusCode::FORBIDDEN);

    // An outsider gets "not found", not "forbidden".
    let hidden = client
        .post(&format!("/api/organizations/{org_id}/invites"))
        .add_header("Authorization", bearer(&outsider))
        .await;
    hidden.assert_status(axum::http::StatusCode::NOT_FOUND);
}

/// Requests without a session are rejected.
#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get("/api/organizations").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}
