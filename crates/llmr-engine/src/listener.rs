//! Push listener.
//!
//! Holds one subscription per report event kind for the lifetime of the
//! engine. Each payload is turned into a candidate [`Update`] and forwarded
//! unless it names a room other than the active one. The reconciler repeats
//! that check on arrival, since the active room may change in between.

use llmr_push::{EventKind, PushHub, Subscription};
use llmr_reconcile::{SessionSnapshot, Update};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Message recorded when an `llm.error` event carries none.
pub const DEFAULT_PUSH_ERROR: &str = "report generation failed";

/// Translate a push payload into a candidate update.
///
/// `None` for a progress event without a string `stage`; the session keeps
/// its previous stage.
pub fn translate(kind: EventKind, payload: &Value) -> Option<Update> {
    let update = match kind {
        EventKind::Progress => Update::push_progress(
            llmr_report::correlation_id(payload),
            payload.get("stage").and_then(Value::as_str)?,
        ),
        EventKind::Result => Update::push_result(llmr_report::normalize(payload)),
        EventKind::Error => Update::push_error(
            llmr_report::correlation_id(payload),
            payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_PUSH_ERROR),
        ),
    };
    Some(update)
}

/// Pre-filter: drop only when both ids are known and differ.
pub fn admits(active_room_id: Option<&str>, candidate: Option<&str>) -> bool {
    match (active_room_id, candidate) {
        (Some(active), Some(got)) => active == got,
        _ => true,
    }
}

fn candidate_id(update: &Update) -> Option<&str> {
    match &update.origin {
        llmr_reconcile::Origin::Push { correlation_id } => correlation_id.as_deref(),
        _ => None,
    }
}

pub struct PushListener {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl PushListener {
    /// Subscribe to all three event kinds and start forwarding.
    ///
    /// Subscriptions are registered before this returns, so events published
    /// right after `spawn` are not missed.
    pub fn spawn(
        hub: &PushHub,
        session: watch::Receiver<SessionSnapshot>,
        sink: mpsc::UnboundedSender<Update>,
        cancel: CancellationToken,
    ) -> Self {
        let progress = hub.subscribe(EventKind::Progress);
        let result = hub.subscribe(EventKind::Result);
        let error = hub.subscribe(EventKind::Error);

        let task = tokio::spawn(forward(
            [progress, result, error],
            session,
            sink,
            cancel.clone(),
        ));
        Self { task, cancel }
    }

    /// Unsubscribe all three streams and wait for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

async fn forward(
    subscriptions: [Subscription; 3],
    session: watch::Receiver<SessionSnapshot>,
    sink: mpsc::UnboundedSender<Update>,
    cancel: CancellationToken,
) {
    let [mut progress, mut result, mut error] = subscriptions;

    loop {
        let (kind, payload) = tokio::select! {
            _ = cancel.cancelled() => break,
            Some(p) = progress.recv() => (EventKind::Progress, p),
            Some(p) = result.recv() => (EventKind::Result, p),
            Some(p) = error.recv() => (EventKind::Error, p),
            else => break,
        };

        let Some(update) = translate(kind, &payload) else {
            debug!(event = kind.as_str(), "ignoring push event without a stage");
            continue;
        };
        let active = session.borrow().active_room_id.clone();
        if !admits(active.as_deref(), candidate_id(&update)) {
            debug!(
                event = kind.as_str(),
                active_room_id = ?active,
                room_id = ?candidate_id(&update),
                "dropping push event for another room"
            );
            continue;
        }
        if sink.send(update).is_err() {
            break;
        }
    }

    // Subscriptions drop here, which unsubscribes them from the hub.
    debug!("push listener stopped");
}
