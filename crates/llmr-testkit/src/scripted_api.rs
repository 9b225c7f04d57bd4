use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use llmr_client::{ClientError, PollOutcome, ReportApi};
use tokio::sync::Semaphore;

#[derive(Default)]
struct Script {
    triggers: VecDeque<Result<(), ClientError>>,
    polls: HashMap<String, VecDeque<PollOutcome>>,
    trigger_calls: Vec<String>,
    poll_calls: Vec<String>,
}

/// Scripted in-memory [`ReportApi`].
///
/// - Trigger answers are consumed in call order; an empty script acknowledges.
/// - Poll answers are scripted per room; an empty script answers `Pending`.
/// - With a poll gate, every `fetch_once` waits for a permit released by
///   [`ScriptedReportApi::release_polls`] before answering.
///
/// In-flight fetches are counted even when the caller drops the future
/// half-way, so `max_in_flight` reflects real overlap.
#[derive(Default)]
pub struct ScriptedReportApi {
    script: Mutex<Script>,
    poll_gate: Option<Semaphore>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedReportApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polls block until permits are released.
    pub fn with_poll_gate() -> Self {
        Self {
            poll_gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn push_trigger(&self, answer: Result<(), ClientError>) -> &Self {
        self.script().triggers.push_back(answer);
        self
    }

    pub fn push_poll(&self, room_id: &str, outcome: PollOutcome) -> &Self {
        self.script()
            .polls
            .entry(room_id.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Script `pending` answers followed by one final outcome.
    pub fn script_polls(&self, room_id: &str, pending: usize, last: PollOutcome) -> &Self {
        for _ in 0..pending {
            self.push_poll(room_id, PollOutcome::Pending);
        }
        self.push_poll(room_id, last)
    }

    /// Let `n` gated polls proceed. No effect without a gate.
    pub fn release_polls(&self, n: usize) {
        if let Some(gate) = &self.poll_gate {
            gate.add_permits(n);
        }
    }

    pub fn trigger_calls(&self) -> Vec<String> {
        self.script().trigger_calls.clone()
    }

    pub fn poll_calls(&self) -> Vec<String> {
        self.script().poll_calls.clone()
    }

    pub fn poll_count(&self, room_id: &str) -> usize {
        self.script()
            .poll_calls
            .iter()
            .filter(|r| r.as_str() == room_id)
            .count()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportApi for ScriptedReportApi {
    async fn trigger(&self, room_id: &str) -> Result<(), ClientError> {
        let mut s = self.script();
        s.trigger_calls.push(room_id.to_string());
        s.triggers.pop_front().unwrap_or(Ok(()))
    }

    async fn fetch_once(&self, room_id: &str) -> PollOutcome {
        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);
        self.script().poll_calls.push(room_id.to_string());

        if let Some(gate) = &self.poll_gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return PollOutcome::Pending,
            }
        }

        self.script()
            .polls
            .get_mut(room_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(PollOutcome::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmr_client::Operation;

    #[tokio::test]
    async fn empty_scripts_ack_and_stay_pending() {
        let api = ScriptedReportApi::new();
        api.trigger("rm").await.unwrap();
        assert_eq!(api.fetch_once("rm").await, PollOutcome::Pending);
        assert_eq!(api.trigger_calls(), vec!["rm"]);
        assert_eq!(api.poll_count("rm"), 1);
    }

    #[tokio::test]
    async fn scripted_answers_are_consumed_in_order() {
        let api = ScriptedReportApi::new();
        let failure = ClientError::UnexpectedStatus {
            op: Operation::Trigger,
            status: 500,
            detail: None,
        };
        api.push_trigger(Err(failure.clone()));
        api.script_polls(
            "rm",
            1,
            PollOutcome::Failed(ClientError::Decode {
                message: "bad".into(),
            }),
        );

        assert_eq!(api.trigger("rm").await, Err(failure));
        assert_eq!(api.trigger("rm").await, Ok(()));
        assert_eq!(api.fetch_once("rm").await, PollOutcome::Pending);
        assert!(matches!(api.fetch_once("rm").await, PollOutcome::Failed(_)));
        assert_eq!(api.fetch_once("other").await, PollOutcome::Pending);
        assert_eq!(api.poll_count("rm"), 2);
    }

    #[tokio::test]
    async fn dropped_gated_fetch_is_not_counted_in_flight() {
        let api = ScriptedReportApi::with_poll_gate();
        let res = tokio::time::timeout(std::time::Duration::from_millis(10), api.fetch_once("rm"))
            .await;
        assert!(res.is_err());
        assert_eq!(api.in_flight(), 0);
        assert_eq!(api.max_in_flight(), 1);

        api.release_polls(1);
        assert_eq!(api.fetch_once("rm").await, PollOutcome::Pending);
    }
}
