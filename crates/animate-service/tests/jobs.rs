//! Job status integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

async fn streamed_job_id(harness: &TestHarness) -> String {
    let response = harness
        .server
        .post("/generate-stream")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "A circle" }))
        .await;
    response.assert_status_ok();
    response
        .header("x-job-id")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn finished_job_reports_completion() {
    let harness = TestHarness::new();
    let job_id = streamed_job_id(&harness).await;

    let response = harness
        .server
        .get(&format!("/job/{job_id}/status"))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["step"], 6);
    assert_eq!(body["status"], "complete");
    assert!(body["code"].is_string());
}

#[tokio::test]
async fn unknown_job_reads_as_pending() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/job/6f1c1f9e-2d7e-4a3b-9a53-0c1d2e3f4a5b/status")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["step"], 0);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Job is queued or not found");
}

#[tokio::test]
async fn job_status_is_owner_only() {
    let harness = TestHarness::new();
    let job_id = streamed_job_id(&harness).await;

    let response = harness
        .server
        .get(&format!("/job/{job_id}/status"))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_job_id_is_bad_request() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/job/not-a-uuid/status")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
