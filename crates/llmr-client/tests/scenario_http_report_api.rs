//! Scenario: HTTP report API contract
//!
//! # Invariants under test
//!
//! 1. Trigger: any 2xx is success; non-2xx is a failure carrying the status
//!    and the server's `detail` message when present.
//! 2. Poll: 200 + JSON is Ready (normalized), 202 is Pending, other statuses
//!    fail, a non-JSON 200 body fails with a decode error.
//! 3. Transport errors surface as failures, never panics.
//! 4. The bearer token is sent when configured.
//!
//! Uses httpmock; no external network.

use httpmock::prelude::*;
use llmr_client::{ClientError, HttpOptions, HttpReportApi, Operation, PollOutcome, ReportApi};
use llmr_report::Severity;
use serde_json::json;

#[tokio::test]
async fn trigger_accepts_any_2xx() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/llm/reports/rm_1");
            then.status(202).json_body(json!({"status": "accepted"}));
        })
        .await;

    let api = HttpReportApi::new(&server.base_url()).unwrap();
    api.trigger("rm_1").await.unwrap();
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn trigger_non_2xx_is_failure_with_detail() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/llm/reports/rm_1");
            then.status(404).json_body(json!({"detail": "room not found"}));
        })
        .await;

    let api = HttpReportApi::new(&server.base_url()).unwrap();
    let err = api.trigger("rm_1").await.unwrap_err();

    assert_eq!(
        err,
        ClientError::UnexpectedStatus {
            op: Operation::Trigger,
            status: 404,
            detail: Some("room not found".into()),
        }
    );
}

#[tokio::test]
async fn poll_200_is_ready_and_normalized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/llm/reports/rm_1");
            then.status(200).json_body(json!({
                "report_id": "rm_1",
                "status": "done",
                "detail": {"caution_points": [{"title": "A", "color": "red"}]}
            }));
        })
        .await;

    let api = HttpReportApi::new(&server.base_url()).unwrap();
    match api.fetch_once("rm_1").await {
        PollOutcome::Ready(r) => {
            assert_eq!(r.room_id, "rm_1");
            assert_eq!(r.caution_points.len(), 1);
            assert_eq!(r.caution_points[0].severity, Severity::High);
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn poll_202_is_pending() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/llm/reports/rm_1");
            then.status(202);
        })
        .await;

    let api = HttpReportApi::new(&server.base_url()).unwrap();
    let out = api.fetch_once("rm_1").await;
    assert_eq!(out, PollOutcome::Pending);
}

#[tokio::test]
async fn poll_other_status_is_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/llm/reports/rm_1");
            then.status(500).body("internal error");
        })
        .await;

    let api = HttpReportApi::new(&server.base_url()).unwrap();
    match api.fetch_once("rm_1").await {
        PollOutcome::Failed(ClientError::UnexpectedStatus {
            op, status, detail, ..
        }) => {
            assert_eq!(op, Operation::Poll);
            assert_eq!(status, 500);
            assert!(detail.is_none());
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn poll_200_with_garbage_body_is_decode_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/llm/reports/rm_1");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let api = HttpReportApi::new(&server.base_url()).unwrap();
    let out = api.fetch_once("rm_1").await;
    assert!(matches!(out, PollOutcome::Failed(ClientError::Decode { .. })));
}

#[tokio::test]
async fn transport_error_is_failure() {
    // Port 9 (discard) on localhost: nothing listens in the test environment.
    let api = HttpReportApi::new("http://127.0.0.1:9").unwrap();

    let trig = api.trigger("rm_1").await;
    assert!(matches!(
        trig,
        Err(ClientError::Transport {
            op: Operation::Trigger,
            ..
        })
    ));

    let out = api.fetch_once("rm_1").await;
    assert!(matches!(
        out,
        PollOutcome::Failed(ClientError::Transport {
            op: Operation::Poll,
            ..
        })
    ));
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/llm/reports/rm_1")
                .header("authorization", "Bearer test-token");
            then.status(200);
        })
        .await;

    let api = HttpReportApi::with_options(
        &server.base_url(),
        HttpOptions {
            bearer_token: Some("test-token".into()),
            timeout: None,
        },
    )
    .unwrap();
    api.trigger("rm_1").await.unwrap();
    m.assert_hits_async(1).await;
}
