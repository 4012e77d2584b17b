mod helpers;

use helpers::auth::{bearer, register_test_user, TestUser};
use helpers::{setup_test_app, TestApp};

async fn create_org_and_project(app: &TestApp, owner: &TestUser) -> (String, String) {
    let client = app.client();

    let org = client
        .post("/api/organizations")
        .add_header("Authorization", bearer(owner))
        .json(&serde_json::json!({ "name": "Incident Org" }))
        .await;
    let org_id = org.json::<serde_json::Value>()["organization"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let project = client
        .post(&format!("/api/organizations/{org_id}/projects"))
        .add_header("Authorization", bearer(owner))
        .json(&serde_json::json!({
            "name": "Plant A",
            "type": "project",
            "status": "active"
        }))
        .await;
    project.assert_status(axum::http::StatusCode::CREATED);
    let project_id = project.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    (org_id, project_id)
}

/// Scenario: a high-severity incident starts `open`; resolve sets
/// `resolved_at`; close sets `closed_at` and writes an audit-log row with
/// action "closed".
#[tokio::test]
async fn test_incident_resolve_then_close_with_audit_log() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = register_test_user(app.pool(), "owner@example.com").await;
    let (org_id, project_id) = create_org_and_project(&app, &owner).await;

    let created = client
        .post(&format!("/api/organizations/{org_id}/incidents"))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({
            "projectId": project_id,
            "title": "Fuel spill at depot",
            "severity": "high"
        }))
        .await;
    created.assert_status(axum::http::StatusCode::CREATED);
    let incident: serde_json::Value = created.json();
    let incident_id = incident["id"].as_str().unwrap().to_string();
    assert_eq!(incident["status"], "open");
    assert!(incident["resolved_at"].is_null());
    assert!(incident["closed_at"].is_null());

    let resolved = client
        .post(&format!(
            "/api/organizations/{org_id}/incidents/{incident_id}/status"
        ))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({ "status": "resolved" }))
        .await;
    resolved.assert_status_ok();
    let resolved_body: serde_json::Value = resolved.json();
    assert_eq!(resolved_body["status"], "resolved");
    assert!(!resolved_body["resolved_at"].is_null());
    assert!(resolved_body["closed_at"].is_null());

    let closed = client
        .post(&format!(
            "/api/organizations/{org_id}/incidents/{incident_id}/status"
        ))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({ "status": "closed", "note": "verified cleanup" }))
        .await;
    closed.assert_status_ok();
    let closed_body: serde_json::Value = closed.json();
    assert_eq!(closed_body["status"], "closed");
    assert!(!closed_body["closed_at"].is_null());

    let logs = client
        .get(&format!(
            "/api/organizations/{org_id}/incidents/{incident_id}/audit-logs"
        ))
        .add_header("Authorization", bearer(&owner))
        .await;
    logs.assert_status_ok();
    let logs_body: serde_json::Value = logs.json();
    let actions: Vec<&str> = logs_body["audit_logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["resolved", "closed"]);
    let close_log = &logs_body["audit_logs"][1];
    assert_eq!(close_log["details"], "verified cleanup");
}

/// `closed` is terminal: any further transition is rejected.
#[tokio::test]
async fn test_closed_incident_rejects_transitions() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = register_test_user(app.pool(), "owner@example.com").await;
    let (org_id, project_id) = create_org_and_project(&app, &owner).await;

    let created = client
        .post(&format!("/api/organizations/{org_id}/incidents"))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({
            "projectId": project_id,
            "title": "Leak",
            "severity": "medium"
        }))
        .await;
    let incident_id = created.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    client
        .post(&format!(
            "/api/organizations/{org_id}/incidents/{incident_id}/status"
        ))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({ "status": "closed" }))
        .await
        .assert_status_ok();

    for next in ["open", "in_progress", "resolved"] {
        let rejected = client
            .post(&format!(
                "/api/organizations/{org_id}/incidents/{incident_id}/status"
            ))
            .add_header("Authorization", bearer(&owner))
            .json(&serde_json::json!({ "status": next }))
            .await;
        rejected.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let err: serde_json::Value = rejected.json();
        assert_eq!(err["code"], "INVALID_STATUS_TRANSITION");
    }
}

/// Tenant isolation: a user from another organization cannot see or close
/// this organization's incidents (404, not 403).
#[tokio::test]
async fn test_incident_isolation_across_organizations() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = register_test_user(app.pool(), "owner@example.com").await;
    let stranger = register_test_user(app.pool(), "stranger@example.com").await;
    let (org_id, project_id) = create_org_and_project(&app, &owner).await;

    // The stranger runs their own organization.
    client
        .post("/api/organizations")
        .add_header("Authorization", bearer(&stranger))
        .json(&serde_json::json!({ "name": "Other Org" }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let created = client
        .post(&format!("/api/organizations/{org_id}/incidents"))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({
            "projectId": project_id,
            "title": "Private incident",
            "severity": "low"
        }))
        .await;
    let incident_id = created.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let get = client
        .get(&format!(
            "/api/organizations/{org_id}/incidents/{incident_id}"
        ))
        .add_header("Authorization", bearer(&stranger))
        .await;
    get.assert_status(axum::http::StatusCode::NOT_FOUND);

    let close = client
        .post(&format!(
            "/api/organizations/{org_id}/incidents/{incident_id}/status"
        ))
        .add_header("Authorization", bearer(&stranger))
        .json(&serde_json::json!({ "status": "closed" }))
        .await;
    close.assert_status(axum::http::StatusCode::NOT_FOUND);
}

/// A project's parent must be a business unit.
#[tokio::test]
async fn test_project_parent_must_be_business_unit() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = register_test_user(app.pool(), "owner@example.com").await;
    let (org_id, project_id) = create_org_and_project(&app, &owner).await;

    // Using a plain project as parent is rejected.
    let invalid = client
        .post(&format!("/api/organizations/{org_id}/projects"))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({
            "name": "Child",
            "type": "project",
            "parentId": project_id
        }))
        .await;
    invalid.assert_status(axum::http::StatusCode::BAD_REQUEST);

    // A business unit works.
    let unit = client
        .post(&format!("/api/organizations/{org_id}/projects"))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({ "name": "EMEA", "type": "business_unit" }))
        .await;
    unit.assert_status(axum::http::StatusCode::CREATED);
    let unit_id = unit.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let valid = client
        .post(&format!("/api/organizations/{org_id}/projects"))
        .add_header("Authorization", bearer(&owner))
        .json(&serde_json::json!({
            "name": "Child",
            "type": "project",
            "parentId": unit_id
        }))
        .await;
    valid.assert_status(axum::http::StatusCode::CREATED);
}
