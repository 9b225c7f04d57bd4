//! llmr-reconcile
//!
//! Reconciliation of the two racing completion channels (poll and push) into
//! one authoritative report status.
//!
//! - Exactly one terminal transition per generation request
//! - Stale generations are discarded
//! - Push events for a foreign room are discarded
//! - A late result for the same room may replace the report, never the status
//!
//! Deterministic, pure logic. No IO. No clock.

mod session;
mod types;

pub use session::{Session, COMPLETED_STAGE};
pub use types::*;
