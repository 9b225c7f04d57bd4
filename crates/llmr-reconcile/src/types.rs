use std::fmt;

use llmr_report::Report;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Coarse session status observed by callers.
///
/// `Idle` only exists before the first `begin`; a restart goes straight to
/// `Triggering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Triggering,
    Processing,
    /// **Terminal.**
    Done,
    /// **Terminal.**
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Triggering => "triggering",
            Status::Processing => "processing",
            Status::Done => "done",
            Status::Error => "error",
        }
    }

    /// Returns `true` if the session left `processing` for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Error)
    }

    /// `true` while a generation request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Status::Triggering | Status::Processing)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Session generation token.
///
/// Every `begin` allocates the next value. Trigger and poll work captures the
/// token it was issued under; the session discards its results once the
/// current token has moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Which channel produced a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport error or non-2xx on the trigger call.
    Trigger,
    /// Transport error, unexpected status or undecodable body on a poll.
    Poll,
    /// Explicit `llm.error` event from the push channel.
    Push,
}

/// Recorded reason for `Status::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Where a candidate update came from, with the identity it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Trigger(Generation),
    Poll(Generation),
    /// Push events carry a correlation id when the payload names a room.
    Push { correlation_id: Option<String> },
}

impl Origin {
    pub fn label(&self) -> &'static str {
        match self {
            Origin::Trigger(_) => "trigger",
            Origin::Poll(_) => "poll",
            Origin::Push { .. } => "push",
        }
    }
}

/// What a channel is reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// Trigger call accepted by the backend.
    Acknowledged,
    /// Poll answered "still processing".
    Pending,
    Progress { stage: String },
    Ready(Report),
    Failed(Failure),
}

impl UpdateKind {
    pub fn label(&self) -> &'static str {
        match self {
            UpdateKind::Acknowledged => "acknowledged",
            UpdateKind::Pending => "pending",
            UpdateKind::Progress { .. } => "progress",
            UpdateKind::Ready(_) => "ready",
            UpdateKind::Failed(_) => "failed",
        }
    }
}

/// Tagged candidate update fed to [`crate::Session::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub origin: Origin,
    pub kind: UpdateKind,
}

impl Update {
    pub fn trigger_ack(generation: Generation) -> Self {
        Self {
            origin: Origin::Trigger(generation),
            kind: UpdateKind::Acknowledged,
        }
    }

    pub fn trigger_failed(generation: Generation, message: impl Into<String>) -> Self {
        Self {
            origin: Origin::Trigger(generation),
            kind: UpdateKind::Failed(Failure::new(FailureKind::Trigger, message)),
        }
    }

    pub fn poll_pending(generation: Generation) -> Self {
        Self {
            origin: Origin::Poll(generation),
            kind: UpdateKind::Pending,
        }
    }

    pub fn poll_ready(generation: Generation, report: Report) -> Self {
        Self {
            origin: Origin::Poll(generation),
            kind: UpdateKind::Ready(report),
        }
    }

    pub fn poll_failed(generation: Generation, message: impl Into<String>) -> Self {
        Self {
            origin: Origin::Poll(generation),
            kind: UpdateKind::Failed(Failure::new(FailureKind::Poll, message)),
        }
    }

    pub fn push_progress(correlation_id: Option<String>, stage: impl Into<String>) -> Self {
        Self {
            origin: Origin::Push { correlation_id },
            kind: UpdateKind::Progress {
                stage: stage.into(),
            },
        }
    }

    /// Push result; the correlation id is taken from the report itself.
    pub fn push_result(report: Report) -> Self {
        let correlation_id = report.correlation_id().map(str::to_string);
        Self {
            origin: Origin::Push { correlation_id },
            kind: UpdateKind::Ready(report),
        }
    }

    pub fn push_error(correlation_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            origin: Origin::Push { correlation_id },
            kind: UpdateKind::Failed(Failure::new(FailureKind::Push, message)),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why an update had no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    /// Issued under a generation that has since been superseded.
    StaleGeneration { current: Generation, got: Generation },
    /// Correlation id names a different room than the active one.
    ForeignRoom { active: String, got: String },
    /// Session already reached a terminal status this update may not touch.
    AlreadyTerminal(Status),
    /// Update makes no sense in the current status (e.g. ack while idle).
    NotApplicable(Status),
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discard::StaleGeneration { current, got } => {
                write!(f, "stale generation {got} (current {current})")
            }
            Discard::ForeignRoom { active, got } => {
                write!(f, "foreign room '{got}' (active '{active}')")
            }
            Discard::AlreadyTerminal(s) => write!(f, "session already {s}"),
            Discard::NotApplicable(s) => write!(f, "not applicable while {s}"),
        }
    }
}

/// Outcome of applying one [`Update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Transition { from: Status, to: Status },
    /// Report overwritten while already `Done`; status untouched.
    ReportReplaced,
    StageUpdated,
    /// Accepted, nothing to change (poll pending).
    Unchanged,
    Discarded(Discard),
}

impl Decision {
    pub fn is_discarded(&self) -> bool {
        matches!(self, Decision::Discarded(_))
    }

    /// The status entered by this decision, if it was a transition.
    pub fn entered(&self) -> Option<Status> {
        match self {
            Decision::Transition { to, .. } => Some(*to),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of a session, handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub generation: Generation,
    pub active_room_id: Option<String>,
    pub status: Status,
    pub progress_stage: Option<String>,
    pub last_error: Option<Failure>,
    pub report: Option<Report>,
}

impl SessionSnapshot {
    pub fn last_error_message(&self) -> Option<&str> {
        self.last_error.as_ref().map(|f| f.message.as_str())
    }
}
