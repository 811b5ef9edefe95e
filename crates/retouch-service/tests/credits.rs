//! Credit balance and journal integration tests.

mod common;

use common::TestHarness;

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn balance_starts_at_zero() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 0);
}

#[tokio::test]
async fn balance_reflects_grants() {
    let harness = TestHarness::new();
    harness.grant_credits(50);

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 50);
}

#[tokio::test]
async fn balance_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/credits/balance").await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn garbage_token_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", "Bearer not-a-jwt")
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Journal
// ============================================================================

#[tokio::test]
async fn entries_list_newest_first() {
    let harness = TestHarness::new();
    harness.grant_credits(10);
    harness.grant_credits(50);

    let response = harness
        .server
        .get("/v1/credits/entries")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let entries = body.as_array().expect("entries array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["amount"], 50);
    assert_eq!(entries[0]["balance_after"], 60);
    assert_eq!(entries[1]["amount"], 10);
}

#[tokio::test]
async fn entries_are_per_user() {
    let harness = TestHarness::new();
    harness.grant_credits(10);

    let response = harness
        .server
        .get("/v1/credits/entries")
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body.as_array().expect("entries array").is_empty());
}
