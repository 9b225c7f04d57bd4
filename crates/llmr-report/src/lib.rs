//! llmr-report
//!
//! Canonical LLM analysis report model and the normalizer that builds it from
//! loosely-typed upstream payloads.
//!
//! Pure logic. No IO. The only impurity is defaulting `createdAt` to the
//! current time when a payload omits it; use [`normalize_at`] to pin the clock.

pub mod normalizer;
mod types;

pub use normalizer::{correlation_id, normalize, normalize_at, ROOM_ID_KEYS};
pub use types::*;
