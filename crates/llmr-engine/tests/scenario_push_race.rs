//! Scenario: push channel racing the poll loop
//!
//! # Invariants under test
//!
//! 1. A push error for the active room ends the session before any poll
//!    resolves; the recorded message is the event's message.
//! 2. Push progress only updates the stage; one without a stage changes nothing.
//! 3. Events naming another room are dropped, whatever their timing.
//! 4. A push result wins over a pending poll; polling stops.
//! 5. A later poll or push result for the same room replaces the report but
//!    never re-enters the transition.

use std::sync::Arc;
use std::time::Duration;

use llmr_client::PollOutcome;
use llmr_engine::{Engine, EngineOptions, Status};
use llmr_push::{EventKind, PushHub};
use llmr_report::normalize;
use llmr_testkit::{error_payload, progress_payload, single_caution_payload, ScriptedReportApi};
use serde_json::json;

fn engine(api: &Arc<ScriptedReportApi>, hub: &PushHub) -> Engine {
    Engine::spawn(api.clone(), hub, EngineOptions::default())
}

async fn settle() {
    // Let spawned tasks drain their queues; paused time makes this instant.
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn push_error_for_active_room_wins_before_poll_resolves() {
    let api = Arc::new(ScriptedReportApi::with_poll_gate());
    let hub = PushHub::new();
    let engine = engine(&api, &hub);

    let g = engine.start("rm_1").await.unwrap();
    settle().await;
    assert_eq!(engine.snapshot().status, Status::Processing);
    assert_eq!(api.in_flight(), 1);

    hub.publish(EventKind::Error, error_payload("rm_1", "transcript too short"));
    let snap = engine.wait_for_terminal(g).await.unwrap();

    assert_eq!(snap.status, Status::Error);
    assert_eq!(snap.last_error_message(), Some("transcript too short"));

    // The held poll was cancelled and nothing else is scheduled.
    settle().await;
    assert_eq!(api.in_flight(), 0);
    api.release_polls(10);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.poll_count("rm_1"), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_updates_stage_only() {
    let api = Arc::new(ScriptedReportApi::with_poll_gate());
    let hub = PushHub::new();
    let engine = engine(&api, &hub);

    engine.start("rm_1").await.unwrap();
    settle().await;

    hub.publish(EventKind::Progress, progress_payload("rm_1", "summarizing"));
    settle().await;

    let snap = engine.snapshot();
    assert_eq!(snap.status, Status::Processing);
    assert_eq!(snap.progress_stage.as_deref(), Some("summarizing"));
}

#[tokio::test(start_paused = true)]
async fn progress_without_stage_keeps_previous_stage() {
    let api = Arc::new(ScriptedReportApi::with_poll_gate());
    let hub = PushHub::new();
    let engine = engine(&api, &hub);

    engine.start("rm_1").await.unwrap();
    settle().await;

    hub.publish(EventKind::Progress, progress_payload("rm_1", "chunking"));
    hub.publish(EventKind::Progress, json!({"room_id": "rm_1"}));
    settle().await;

    let snap = engine.snapshot();
    assert_eq!(snap.status, Status::Processing);
    assert_eq!(snap.progress_stage.as_deref(), Some("chunking"));
}

#[tokio::test(start_paused = true)]
async fn foreign_room_events_are_ignored() {
    let api = Arc::new(ScriptedReportApi::with_poll_gate());
    let hub = PushHub::new();
    let engine = engine(&api, &hub);

    engine.start("rm_1").await.unwrap();
    settle().await;
    let before = engine.snapshot();

    hub.publish(EventKind::Progress, progress_payload("rm_2", "chunking"));
    hub.publish(EventKind::Error, error_payload("rm_2", "boom"));
    hub.publish(EventKind::Result, single_caution_payload("rm_2"));
    settle().await;

    assert_eq!(engine.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn foreign_result_after_done_leaves_session_untouched() {
    let api = Arc::new(ScriptedReportApi::new());
    api.push_poll(
        "rm_1",
        PollOutcome::Ready(normalize(&single_caution_payload("rm_1"))),
    );
    let hub = PushHub::new();
    let engine = engine(&api, &hub);

    let g = engine.start("rm_1").await.unwrap();
    let done = engine.wait_for_terminal(g).await.unwrap();

    hub.publish(
        EventKind::Result,
        json!({"room_id": "rm_2", "detail": {"summary": "someone else"}}),
    );
    settle().await;

    assert_eq!(engine.snapshot(), done);
}

#[tokio::test(start_paused = true)]
async fn push_result_wins_and_stops_polling() {
    let api = Arc::new(ScriptedReportApi::new());
    let hub = PushHub::new();
    let engine = engine(&api, &hub);

    let g = engine.start("rm_1").await.unwrap();
    settle().await;
    assert_eq!(api.poll_count("rm_1"), 1);

    hub.publish(
        EventKind::Result,
        json!({"roomId": "rm_1", "detail": {"summary": "from push"}}),
    );
    let snap = engine.wait_for_terminal(g).await.unwrap();
    assert_eq!(snap.status, Status::Done);
    assert_eq!(
        snap.report.unwrap().summary.as_deref(),
        Some("from push")
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.poll_count("rm_1"), 1);
}

#[tokio::test(start_paused = true)]
async fn late_push_result_replaces_report_after_poll_done() {
    let api = Arc::new(ScriptedReportApi::new());
    api.push_poll(
        "rm_1",
        PollOutcome::Ready(normalize(&single_caution_payload("rm_1"))),
    );
    let hub = PushHub::new();
    let engine = engine(&api, &hub);
    let mut rx = engine.subscribe();

    let g = engine.start("rm_1").await.unwrap();
    engine.wait_for_terminal(g).await.unwrap();

    hub.publish(
        EventKind::Result,
        json!({
            "room_id": "rm_1",
            "detail": {"summary": "richer", "good_points": [{"title": "B"}]}
        }),
    );
    settle().await;

    let snap = rx.borrow_and_update().clone();
    assert_eq!(snap.status, Status::Done);
    assert_eq!(snap.generation, g);
    let report = snap.report.unwrap();
    assert_eq!(report.summary.as_deref(), Some("richer"));
    assert_eq!(report.good_points.len(), 1);

    // A late error is dropped once done.
    hub.publish(EventKind::Error, error_payload("rm_1", "too late"));
    settle().await;
    assert_eq!(engine.snapshot().status, Status::Done);
    assert!(engine.snapshot().last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn push_event_without_room_id_is_accepted() {
    let api = Arc::new(ScriptedReportApi::with_poll_gate());
    let hub = PushHub::new();
    let engine = engine(&api, &hub);

    let g = engine.start("rm_1").await.unwrap();
    settle().await;

    hub.publish(EventKind::Error, json!({}));
    let snap = engine.wait_for_terminal(g).await.unwrap();
    assert_eq!(snap.status, Status::Error);
    assert_eq!(
        snap.last_error_message(),
        Some(llmr_engine::DEFAULT_PUSH_ERROR)
    );
}
