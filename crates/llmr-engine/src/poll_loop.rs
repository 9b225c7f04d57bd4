//! Poll loop for one generation request.
//!
//! First attempt runs immediately, then one attempt per interval until the
//! backend answers ready or failed, or the loop is cancelled. Attempts never
//! overlap: the next one is only scheduled after the previous one returned.

use std::sync::Arc;
use std::time::Duration;

use llmr_client::{PollOutcome, ReportApi};
use llmr_reconcile::{Generation, Update};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Ready,
    Failed,
    Cancelled,
    /// Nobody is listening for updates any more.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub attempts: u32,
    pub exit: PollExit,
}

pub struct PollLoop {
    api: Arc<dyn ReportApi>,
    room_id: String,
    generation: Generation,
    interval: Duration,
}

impl PollLoop {
    pub fn new(
        api: Arc<dyn ReportApi>,
        room_id: impl Into<String>,
        generation: Generation,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            room_id: room_id.into(),
            generation,
            interval,
        }
    }

    /// Drive the loop, sending one candidate update per attempt to `sink`.
    pub async fn run(
        self,
        sink: mpsc::UnboundedSender<Update>,
        cancel: CancellationToken,
    ) -> PollSummary {
        let mut attempts = 0;

        let exit = loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break PollExit::Cancelled,
                out = self.api.fetch_once(&self.room_id) => out,
            };
            attempts += 1;

            let (update, exit) = match outcome {
                PollOutcome::Ready(report) => (
                    Update::poll_ready(self.generation, report),
                    Some(PollExit::Ready),
                ),
                PollOutcome::Pending => (Update::poll_pending(self.generation), None),
                PollOutcome::Failed(e) => (
                    Update::poll_failed(self.generation, e.to_string()),
                    Some(PollExit::Failed),
                ),
            };
            debug!(
                room_id = %self.room_id,
                generation = %self.generation,
                attempt = attempts,
                outcome = update.kind.label(),
                "report poll"
            );

            if sink.send(update).is_err() {
                break PollExit::Closed;
            }
            if let Some(exit) = exit {
                break exit;
            }

            tokio::select! {
                _ = cancel.cancelled() => break PollExit::Cancelled,
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        PollSummary { attempts, exit }
    }
}
