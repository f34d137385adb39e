//! Usage endpoint integration tests.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::TestHarness;

use animate_store::Store;

#[tokio::test]
async fn new_user_starts_on_free_tier() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/usage/{}", harness.test_user_id))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["tier"], "free");
    assert_eq!(body["used"], 0);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["remaining"], 5);
    assert_eq!(body["basic_credits"], 0);
    assert!(body["reset_date"].is_string());
}

#[tokio::test]
async fn credits_make_user_basic_tier() {
    let harness = TestHarness::new();
    harness
        .store
        .add_basic_credits(&harness.test_user_id, 5, Utc::now())
        .unwrap();

    let response = harness
        .server
        .get(&format!("/usage/{}", harness.test_user_id))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["tier"], "basic");
    assert_eq!(body["basic_credits"], 5);
}

#[tokio::test]
async fn pro_user_has_pro_limit() {
    let harness = TestHarness::new();
    harness
        .store
        .set_pro_subscription(&harness.test_user_id, true, Utc::now())
        .unwrap();

    let response = harness
        .server
        .get(&format!("/usage/{}", harness.test_user_id))
        .add_header("authorization", harness.user_auth_header())
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["tier"], "pro");
    assert_eq!(body["limit"], 50);
}

#[tokio::test]
async fn usage_requires_auth() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/usage/{}", harness.test_user_id))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn usage_of_another_user_is_forbidden() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/usage/{}", harness.test_user_id))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "forbidden");
}
