//! Session state machine.
//!
//! # Design
//!
//! One [`Session`] per displayed report panel. Every candidate update from the
//! trigger call, the poll loop or the push channel goes through
//! [`Session::apply`], which is the only place status may change.
//!
//! # State diagram
//!
//! ```text
//!   idle ──begin──► triggering ──ack──► processing ──ready──► done
//!                        │                   │                  ▲ │
//!                      failed              failed               │ │ ready (same room):
//!                        ▼                   ▼                  │ ▼ report replaced
//!                      error ◄───────────────┘                  └─┘
//!
//!   begin from done / error ──► triggering (new generation)
//! ```
//!
//! # Staleness
//!
//! Identity is checked when the update *arrives*, never when its request was
//! issued:
//! - trigger / poll updates must carry the current [`Generation`];
//! - push updates whose correlation id is present and differs from the active
//!   room are dropped. Push updates without a correlation id are accepted.
//!
//! At most one terminal transition happens per `begin`. Later `ready` updates
//! for the same identity may replace the report but never touch the status.

use llmr_report::Report;

use crate::types::{
    Decision, Discard, Failure, Generation, Origin, SessionSnapshot, Status, Update, UpdateKind,
};

/// Progress stage recorded when a report is accepted.
pub const COMPLETED_STAGE: &str = "completed";

#[derive(Debug, Clone, Default)]
pub struct Session {
    generation: Generation,
    active_room_id: Option<String>,
    status: Status,
    progress_stage: Option<String>,
    last_error: Option<Failure>,
    report: Option<Report>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn active_room_id(&self) -> Option<&str> {
        self.active_room_id.as_deref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn progress_stage(&self) -> Option<&str> {
        self.progress_stage.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_ref().map(|f| f.message.as_str())
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.last_error.as_ref()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// `true` if `generation` is current and still waiting on a result.
    pub fn is_polling(&self, generation: Generation) -> bool {
        self.generation == generation && self.status == Status::Processing
    }

    /// Start a new generation request for `room_id`.
    ///
    /// Allowed from any status: a start while `processing` supersedes the
    /// running request rather than queueing behind it. Clears error, progress
    /// and report. Returns the new generation token.
    pub fn begin(&mut self, room_id: impl Into<String>) -> Generation {
        self.generation = self.generation.next();
        self.active_room_id = Some(room_id.into());
        self.status = Status::Triggering;
        self.progress_stage = None;
        self.last_error = None;
        self.report = None;
        self.generation
    }

    /// Apply one candidate update.
    pub fn apply(&mut self, update: Update) -> Decision {
        let Update { origin, kind } = update;

        match &origin {
            Origin::Trigger(g) | Origin::Poll(g) => {
                if *g != self.generation {
                    return Decision::Discarded(Discard::StaleGeneration {
                        current: self.generation,
                        got: *g,
                    });
                }
            }
            Origin::Push { correlation_id } => {
                if let Err(d) = self.admits(correlation_id.as_deref()) {
                    return Decision::Discarded(d);
                }
            }
        }

        match (origin, kind) {
            // ------------------------------------------------------------------
            // Trigger outcome
            // ------------------------------------------------------------------
            (Origin::Trigger(_), UpdateKind::Acknowledged) => match self.status {
                Status::Triggering => self.enter(Status::Processing),
                // A push result may already have finished the session.
                s if s.is_terminal() => Decision::Discarded(Discard::AlreadyTerminal(s)),
                s => Decision::Discarded(Discard::NotApplicable(s)),
            },
            (Origin::Trigger(_), UpdateKind::Failed(failure)) => match self.status {
                Status::Triggering => self.fail(failure),
                s if s.is_terminal() => Decision::Discarded(Discard::AlreadyTerminal(s)),
                s => Decision::Discarded(Discard::NotApplicable(s)),
            },

            // ------------------------------------------------------------------
            // Poll outcome
            // ------------------------------------------------------------------
            (Origin::Poll(_), UpdateKind::Pending) => match self.status {
                Status::Processing => Decision::Unchanged,
                s => Decision::Discarded(Discard::NotApplicable(s)),
            },

            // ------------------------------------------------------------------
            // Progress: stage only, never the coarse status.
            // ------------------------------------------------------------------
            (Origin::Push { .. }, UpdateKind::Progress { stage }) => {
                if self.status.is_in_flight() {
                    self.progress_stage = Some(stage);
                    Decision::StageUpdated
                } else if self.status.is_terminal() {
                    Decision::Discarded(Discard::AlreadyTerminal(self.status))
                } else {
                    Decision::Discarded(Discard::NotApplicable(self.status))
                }
            }

            // ------------------------------------------------------------------
            // Ready: first one wins the transition, later ones replace content.
            // ------------------------------------------------------------------
            (origin @ (Origin::Poll(_) | Origin::Push { .. }), UpdateKind::Ready(report)) => {
                if let Origin::Poll(_) = origin {
                    if self.status == Status::Triggering || self.status == Status::Idle {
                        return Decision::Discarded(Discard::NotApplicable(self.status));
                    }
                }
                if let Origin::Push { correlation_id } = &origin {
                    if self.active_room_id.is_none() {
                        self.active_room_id = correlation_id.clone();
                    }
                }
                self.accept_report(report)
            }

            // ------------------------------------------------------------------
            // Failures from poll / push.
            // ------------------------------------------------------------------
            (Origin::Poll(_), UpdateKind::Failed(failure)) => match self.status {
                Status::Processing => self.fail(failure),
                s if s.is_terminal() => Decision::Discarded(Discard::AlreadyTerminal(s)),
                s => Decision::Discarded(Discard::NotApplicable(s)),
            },
            (Origin::Push { .. }, UpdateKind::Failed(failure)) => match self.status {
                Status::Idle | Status::Triggering | Status::Processing => self.fail(failure),
                s => Decision::Discarded(Discard::AlreadyTerminal(s)),
            },

            // Remaining combinations are not produced by any channel.
            _ => Decision::Discarded(Discard::NotApplicable(self.status)),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            active_room_id: self.active_room_id.clone(),
            status: self.status,
            progress_stage: self.progress_stage.clone(),
            last_error: self.last_error.clone(),
            report: self.report.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    /// Correlation filter for push updates.
    fn admits(&self, candidate: Option<&str>) -> Result<(), Discard> {
        match (self.active_room_id.as_deref(), candidate) {
            (Some(active), Some(got)) if active != got => Err(Discard::ForeignRoom {
                active: active.to_string(),
                got: got.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn enter(&mut self, to: Status) -> Decision {
        let from = self.status;
        self.status = to;
        Decision::Transition { from, to }
    }

    fn fail(&mut self, failure: Failure) -> Decision {
        self.last_error = Some(failure);
        self.enter(Status::Error)
    }

    fn accept_report(&mut self, report: Report) -> Decision {
        match self.status {
            Status::Done => {
                self.report = Some(report);
                Decision::ReportReplaced
            }
            Status::Error => Decision::Discarded(Discard::AlreadyTerminal(Status::Error)),
            _ => {
                self.report = Some(report);
                self.progress_stage = Some(COMPLETED_STAGE.to_string());
                self.enter(Status::Done)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
