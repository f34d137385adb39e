//! Client tests against a mock animate service.

use animate_client::{AnimateClient, ClientError, JobProgress, JobStatus, RenderRequest};
use animate_core::{ChatId, JobId, Resolution, UserId, VideoLength};
use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "session-token";

fn client(server: &MockServer) -> AnimateClient {
    AnimateClient::new(server.uri(), TOKEN).unwrap()
}

fn user() -> UserId {
    "user_2abc".parse().unwrap()
}

fn sse_body(events: &[JobProgress]) -> String {
    let mut body = String::from(":\n\n");
    for event in events {
        body.push_str(&format!("data: {}\n\n", serde_json::to_string(event).unwrap()));
    }
    body
}

#[tokio::test]
async fn generate_posts_request_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_json(json!({
            "prompt": "A bouncing ball",
            "length": "Medium (15s)",
            "resolution": "720p"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "video_url": "http://localhost:8000/videos/a.mp4",
            "code": "from manim import *"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = RenderRequest {
        prompt: "A bouncing ball".into(),
        length: VideoLength::Medium,
        resolution: Resolution::Hd,
    };
    let response = client(&server).generate(&request).await.unwrap();

    assert_eq!(response.video_url, "http://localhost:8000/videos/a.mp4");
    assert_eq!(response.code, "from manim import *");
}

#[tokio::test]
async fn quota_denial_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": "quota_exceeded",
                "message": "Free tier limit reached (5/month). Resets on 2026-11-01."
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate(&RenderRequest::new("A circle"))
        .await
        .unwrap_err();

    match err {
        ClientError::QuotaExceeded { message } => assert!(message.contains("Resets on")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn tier_denial_keeps_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": "tier_restricted",
                "message": "Resolution 4k requires a higher tier",
                "details": { "tier": "free", "max_resolution": "720p" }
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate(&RenderRequest::new("A circle"))
        .await
        .unwrap_err();

    match err {
        ClientError::TierRestricted { details, .. } => {
            assert_eq!(details.unwrap()["max_resolution"], "720p");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_errors_report_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage/user_2abc"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).usage(&user()).await.unwrap_err();

    match err {
        ClientError::Api { code, status, .. } => {
            assert_eq!(code, "unknown");
            assert_eq!(status, 502);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn stream_yields_progress_until_terminal() {
    let server = MockServer::start().await;
    let job_id = JobId::generate();
    let mut events = vec![
        JobProgress::analyzing(),
        JobProgress::generating(),
        JobProgress::code_ready("from manim import *"),
        JobProgress::rendering(),
        JobProgress::finalizing(),
        JobProgress::complete(
            "http://localhost:8000/videos/a.mp4".into(),
            "from manim import *".into(),
            Some(ChatId::generate()),
        ),
    ];
    // Anything after the terminal event is ignored.
    events.push(JobProgress::error("late"));

    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .insert_header("x-job-id", job_id.to_string().as_str())
                .set_body_string(sse_body(&events)),
        )
        .mount(&server)
        .await;

    let stream = client(&server)
        .generate_stream(&RenderRequest::new("A circle"))
        .await
        .unwrap();
    assert_eq!(stream.job_id(), Some(&job_id));

    let received: Vec<JobProgress> = stream.map(Result::unwrap).collect().await;
    let steps: Vec<i8> = received.iter().map(|p| p.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(received[5].status, JobStatus::Complete);
    assert!(received[5].chat_id.is_some());
}

#[tokio::test]
async fn stream_denial_is_single_error_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&[JobProgress::error(
                    "Free tier limit reached (5/month).",
                )])),
        )
        .mount(&server)
        .await;

    let stream = client(&server)
        .generate_stream(&RenderRequest::new("A circle"))
        .await
        .unwrap();
    assert!(stream.job_id().is_none());

    let received: Vec<_> = stream.collect().await;
    assert_eq!(received.len(), 1);
    let progress = received[0].as_ref().unwrap();
    assert_eq!(progress.status, JobStatus::Error);
    assert_eq!(progress.step, -1);
}

#[tokio::test]
async fn stream_rejected_before_start() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "unauthorized", "message": "unauthorized" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_stream(&RenderRequest::new("A circle"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 401, .. }));
}

#[tokio::test]
async fn chats_and_usage() {
    let server = MockServer::start().await;
    let chat_id = ChatId::generate();
    let chat = json!({
        "id": chat_id.to_string(),
        "prompt": "A circle",
        "length": "Short (5s)",
        "resolution": "720p",
        "code": "from manim import *",
        "video_url": "http://localhost:8000/videos/a.mp4",
        "created_at": "2026-10-01T12:00:00Z"
    });

    Mock::given(method("GET"))
        .and(path("/chats/user_2abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "chats": [chat], "total": 1 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/chats/user_2abc/{chat_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat.clone()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/chats/user_2abc/{chat_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Chat deleted successfully",
            "id": chat_id.to_string()
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usage/user_2abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tier": "basic",
            "used": 0,
            "limit": 5,
            "remaining": 5,
            "basic_credits": 3,
            "reset_date": "2026-11-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let client = client(&server);

    let list = client.list_chats(&user()).await.unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.chats[0].length, VideoLength::Short);

    let fetched = client.get_chat(&user(), &chat_id).await.unwrap();
    assert_eq!(fetched.id, chat_id.to_string());

    let deleted = client.delete_chat(&user(), &chat_id).await.unwrap();
    assert_eq!(deleted.message, "Chat deleted successfully");

    let usage = client.usage(&user()).await.unwrap();
    assert_eq!(usage.basic_credits, 3);
    assert_eq!(usage.reset_date.to_rfc3339(), "2026-11-01T00:00:00+00:00");
}

#[tokio::test]
async fn job_status_reads_progress() {
    let server = MockServer::start().await;
    let job_id = JobId::generate();
    Mock::given(method("GET"))
        .and(path(format!("/job/{job_id}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(JobProgress::rendering()))
        .mount(&server)
        .await;

    let progress = client(&server).job_status(&job_id).await.unwrap();

    assert_eq!(progress.status, JobStatus::Rendering);
    assert_eq!(progress.step, 4);
}
