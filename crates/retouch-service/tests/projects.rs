//! Project and version-chain integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn create_project_roots_the_chain() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/projects")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "image_ref": "https://img.example/original.png" }))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let latest = &body["latest_version"];
    assert_eq!(latest["image_ref"], "https://img.example/original.png");
    assert_eq!(latest["is_original"], true);
    assert!(latest["parent_id"].is_null());
}

#[tokio::test]
async fn create_project_rejects_empty_image_ref() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/projects")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "image_ref": "  " }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn list_projects_is_scoped_to_owner() {
    let harness = TestHarness::new();
    harness.create_project("https://img.example/a.png").await;

    let own = harness
        .server
        .get("/v1/projects")
        .add_header("authorization", harness.user_auth_header())
        .await;
    own.assert_status_ok();
    let body: serde_json::Value = own.json();
    assert_eq!(body.as_array().expect("projects").len(), 1);

    let foreign = harness
        .server
        .get("/v1/projects")
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;
    foreign.assert_status_ok();
    let body: serde_json::Value = foreign.json();
    assert!(body.as_array().expect("projects").is_empty());
}

#[tokio::test]
async fn foreign_project_is_forbidden() {
    let harness = TestHarness::new();
    let project_id = harness.create_project("https://img.example/a.png").await;

    let response = harness
        .server
        .get(&format!("/v1/projects/{project_id}"))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;

    response.assert_status_forbidden();
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/v1/projects/{}", retouch_core::ProjectId::generate()))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn versions_list_root_first() {
    let harness = TestHarness::new();
    let project_id = harness.create_project("https://img.example/a.png").await;

    let response = harness
        .server
        .get(&format!("/v1/projects/{project_id}/versions"))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let versions = body.as_array().expect("versions");
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["is_original"], true);
}
