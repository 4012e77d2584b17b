mod helpers;

use helpers::auth::{bearer, register_test_user};
use helpers::setup_test_app;

/// Scenario: a non-admin asking about incidents only ever sees incidents
/// from the projects in their `userProjects` list.
#[tokio::test]
async fn test_chat_incident_answer_is_project_scoped() {
    let app = setup_test_app().await;
    let client = app.client();

    let owner = register_test_user(app.pool(), "owner@example.com").await;
    let member = register_test_user(app.pool(), "member@example.com").await;

    let org = client
        .post("/api/organizations")
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({ "name": "Chat Org" }))
        .await;
    let org_id = org.json::<serde_json::Value>()["organization"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Two projects, one incident each.
    let mut project_ids = Vec::new();
    for name in ["Visible Project", "Hidden Project"] {
        let project = client
            .post(&format!("/api/organizations/{org_id}/projects"))
            .add_header("Authorization", bearer(&owner))
            .json(&serde_json::json!({ "name": name, "type": "project", "status": "active" }))
            .await;
        project_ids.push(
            project.json::<serde_json::Value>()["id"]
                .as_str()
                .unwrap()
                .to_string(),
        );
    }
    for (project_id, title) in project_ids.iter().zip(["Visible spill", "Hidden outage"]) {
        client
            .post(&format!("/api/organizations/{org_id}/incidents"))
            .add_header("Authorization", bearer(&owner))
            .json(&serde_json::json!({
                "projectId": project_id,
                "title": title,
                "severity": "high"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    // The member joins the organization and only the first project.
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

    let chat = client
        .post("/api/chat")
        .add_header("Authorization", bearer(&member))
        .json(&serde_json::json!({
            "message": "show me my incidents",
            "userRole": "member",
            "userProjects": [project_ids[0]]
        }))
        .await;
    chat.assert_status_ok();
    let response = chat.json::<serde_json::Value>()["response"]
        .as_str()
        .unwrap()
        .to_string();

    assert!(response.contains("Visible spill"));
    assert!(!response.contains("Hidden outage"));
}

/// The chat endpoint requires a message.
#[tokio::test]
async fn test_chat_requires_message() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(app.pool(), "user@example.com").await;

    let response = client
        .post("/api/chat")
        .add_header("Authorization", bearer(&user))
        .json(&serde_json::json!({}))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

/// Greetings get a canned response without touching project data.
#[tokio::test]
async fn test_chat_greeting() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(app.pool(), "user@example.com").await;

    let response = client
        .post("/api/chat")
        .add_header("Authorization", bearer(&user))
        .json(&serde_json::json!({ "message": "hello" }))
        .await;
    response.assert_status_ok();
    assert!(response.json::<serde_json::Value>()["response"]
        .as_str()
        .unwrap()
        .contains("Hello"));
}
