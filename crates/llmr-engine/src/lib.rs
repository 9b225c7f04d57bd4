//! llmr-engine
//!
//! Async shell around [`llmr_reconcile::Session`].
//!
//! - [`Engine`] is the caller-facing handle.
//! - A single reconciler task owns the session and applies every candidate
//!   update in arrival order.
//! - [`PollLoop`] and [`PushListener`] only produce candidates.
//!
//! Observers follow the session through a `watch` channel of
//! [`SessionSnapshot`] values.

mod engine;
mod listener;
mod poll_loop;

use std::fmt;
use std::time::Duration;

use llmr_reconcile::Generation;

pub use engine::Engine;
pub use listener::{admits, translate, PushListener, DEFAULT_PUSH_ERROR};
pub use llmr_reconcile::{SessionSnapshot, Status};
pub use poll_loop::{PollExit, PollLoop, PollSummary};

/// Fixed delay between two poll attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub poll_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Room id was empty after trimming; the session was left untouched.
    EmptyRoomId,
    /// The engine has been shut down.
    Closed,
    /// A newer `start` replaced the generation being waited on.
    Superseded {
        waited: Generation,
        current: Generation,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::EmptyRoomId => write!(f, "room id must not be empty"),
            EngineError::Closed => write!(f, "report engine is shut down"),
            EngineError::Superseded { waited, current } => {
                write!(f, "generation {waited} superseded by {current}")
            }
        }
    }
}

impl std::error::Error for EngineError {}
