use std::sync::Arc;
use std::time::Duration;

use llmr_client::ReportApi;
use llmr_push::PushHub;
use llmr_reconcile::{Decision, Generation, Session, SessionSnapshot, Status, Update};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::listener::PushListener;
use crate::poll_loop::{PollLoop, PollSummary};
use crate::{EngineError, EngineOptions};

enum Command {
    Start {
        room_id: String,
        reply: oneshot::Sender<Generation>,
    },
}

/// Handle to one running report session.
///
/// Exactly one reconciler task sits behind each handle. Dropping the handle
/// stops it; [`Engine::shutdown`] additionally waits until every push
/// subscription is released.
pub struct Engine {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    shutdown: CancellationToken,
    actor: Option<JoinHandle<()>>,
}

impl Engine {
    /// Start the reconciler and its push listener.
    ///
    /// The listener subscribes before this returns and stays subscribed for
    /// the lifetime of the engine, filtering on whichever room is active.
    pub fn spawn(api: Arc<dyn ReportApi>, hub: &PushHub, options: EngineOptions) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let session = Session::new();
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());
        let shutdown = CancellationToken::new();

        let listener = PushListener::spawn(
            hub,
            snapshots_rx.clone(),
            updates_tx.clone(),
            shutdown.child_token(),
        );

        let reconciler = Reconciler {
            session,
            api,
            poll_interval: options.poll_interval,
            updates: updates_tx,
            snapshots: snapshots_tx,
            poll: None,
            retired: Vec::new(),
            shutdown: shutdown.clone(),
        };
        let actor = tokio::spawn(reconciler.run(commands_rx, updates_rx, listener));

        Self {
            commands: commands_tx,
            snapshots: snapshots_rx,
            shutdown,
            actor: Some(actor),
        }
    }

    /// Begin a new generation request for `room_id`.
    ///
    /// Supersedes whatever request is running. Returns the generation token
    /// of the new request.
    pub async fn start(&self, room_id: &str) -> Result<Generation, EngineError> {
        let room_id = room_id.trim();
        if room_id.is_empty() {
            return Err(EngineError::EmptyRoomId);
        }

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Start {
                room_id: room_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until `generation` reaches `done` or `error`.
    pub async fn wait_for_terminal(
        &self,
        generation: Generation,
    ) -> Result<SessionSnapshot, EngineError> {
        let mut rx = self.snapshots.clone();
        loop {
            {
                let snap = rx.borrow_and_update();
                if snap.generation > generation {
                    return Err(EngineError::Superseded {
                        waited: generation,
                        current: snap.generation,
                    });
                }
                if snap.generation == generation && snap.status.is_terminal() {
                    return Ok(snap.clone());
                }
            }
            rx.changed().await.map_err(|_| EngineError::Closed)?;
        }
    }

    /// Cancel polling, unsubscribe the push listener and stop the reconciler.
    ///
    /// Idempotent. Later calls to [`Engine::start`] return
    /// [`EngineError::Closed`].
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        if let Some(actor) = self.actor.take() {
            if let Err(e) = actor.await {
                warn!(error = %e, "reconciler task ended abnormally");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<PollSummary>,
}

/// Sole owner of the session.
struct Reconciler {
    session: Session,
    api: Arc<dyn ReportApi>,
    poll_interval: Duration,
    updates: mpsc::UnboundedSender<Update>,
    snapshots: watch::Sender<SessionSnapshot>,
    poll: Option<PollTask>,
    /// Cancelled poll loops that may still be unwinding.
    retired: Vec<JoinHandle<PollSummary>>,
    shutdown: CancellationToken,
}

impl Reconciler {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut updates: mpsc::UnboundedReceiver<Update>,
        listener: PushListener,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                cmd = commands.recv() => match cmd {
                    Some(Command::Start { room_id, reply }) => {
                        let generation = self.start(room_id);
                        let _ = reply.send(generation);
                    }
                    None => break,
                },
                Some(update) = updates.recv() => self.apply(update),
            }
        }

        self.stop_polling();
        for handle in self.retired.drain(..) {
            let _ = handle.await;
        }
        listener.shutdown().await;
        info!(generation = %self.session.generation(), "report engine stopped");
    }

    fn start(&mut self, room_id: String) -> Generation {
        self.stop_polling();
        let generation = self.session.begin(room_id.clone());
        info!(room_id = %room_id, generation = %generation, "report generation started");
        self.publish();

        let api = self.api.clone();
        let sink = self.updates.clone();
        let cancel = self.shutdown.child_token();
        tokio::spawn(async move {
            let update = tokio::select! {
                _ = cancel.cancelled() => return,
                res = api.trigger(&room_id) => match res {
                    Ok(()) => Update::trigger_ack(generation),
                    Err(e) => Update::trigger_failed(generation, e.to_string()),
                },
            };
            let _ = sink.send(update);
        });

        generation
    }

    fn apply(&mut self, update: Update) {
        let origin = update.origin.label();
        let kind = update.kind.label();
        let decision = self.session.apply(update);
        let generation = self.session.generation();
        let room_id = self.session.active_room_id().unwrap_or_default();

        match &decision {
            Decision::Discarded(why) => {
                debug!(room_id, generation = %generation, origin, kind, reason = %why, "update discarded");
            }
            Decision::Transition {
                to: Status::Error, ..
            } => {
                warn!(
                    room_id,
                    generation = %generation,
                    origin,
                    error = self.session.last_error().unwrap_or_default(),
                    "report generation failed"
                );
            }
            Decision::Transition { from, to } => {
                info!(room_id, generation = %generation, origin, from = %from, to = %to, "session transition");
            }
            other => {
                debug!(room_id, generation = %generation, origin, kind, decision = ?other, "update applied");
            }
        }

        match decision.entered() {
            Some(Status::Processing) => self.start_polling(),
            Some(s) if s.is_terminal() => self.stop_polling(),
            _ => {}
        }

        if !decision.is_discarded() {
            self.publish();
        }
    }

    fn start_polling(&mut self) {
        let Some(room_id) = self.session.active_room_id().map(str::to_string) else {
            return;
        };
        self.stop_polling();

        let generation = self.session.generation();
        let cancel = self.shutdown.child_token();
        let poll = PollLoop::new(self.api.clone(), room_id.clone(), generation, self.poll_interval);
        let sink = self.updates.clone();
        let token = cancel.clone();
        let prior = std::mem::take(&mut self.retired);

        let handle = tokio::spawn(async move {
            // Never overlap a loop that is still unwinding.
            for h in prior {
                let _ = h.await;
            }
            let summary = poll.run(sink, token).await;
            debug!(
                room_id = %room_id,
                generation = %generation,
                attempts = summary.attempts,
                exit = ?summary.exit,
                "poll loop finished"
            );
            summary
        });

        self.poll = Some(PollTask { cancel, handle });
    }

    fn stop_polling(&mut self) {
        if let Some(task) = self.poll.take() {
            task.cancel.cancel();
            self.retired.retain(|h| !h.is_finished());
            self.retired.push(task.handle);
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }
}
