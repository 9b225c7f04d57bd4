//! llmr-push
//!
//! Push channel boundary: the three report event kinds, an in-process hub that
//! hands out cancellable subscriptions, and a WebSocket reader that feeds it.
//!
//! Filtering by room is not done here; that belongs to the listener in
//! `llmr-engine`.

mod hub;
pub mod ws;

use std::fmt;

pub use hub::{PushHub, Subscription};
pub use ws::WsPushSource;

pub const LLM_PROGRESS: &str = "llm.progress";
pub const LLM_RESULT: &str = "llm.result";
pub const LLM_ERROR: &str = "llm.error";

/// Report push event kinds (protocol names are fixed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `{roomId|room_id, stage}`
    Progress,
    /// Full report payload plus correlation fields.
    Result,
    /// `{roomId|room_id|report_id, message}`
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Progress, EventKind::Result, EventKind::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Progress => LLM_PROGRESS,
            EventKind::Result => LLM_RESULT,
            EventKind::Error => LLM_ERROR,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            LLM_PROGRESS => Some(EventKind::Progress),
            LLM_RESULT => Some(EventKind::Result),
            LLM_ERROR => Some(EventKind::Error),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    Connect { url: String, message: String },
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Connect { url, message } => {
                write!(f, "push channel connect to '{url}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for PushError {}
