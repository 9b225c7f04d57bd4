//! llmr-client
//!
//! Trigger and poll collaborators for report generation.
//!
//! The engine only sees the [`ReportApi`] trait; [`HttpReportApi`] is the
//! production implementation. No retries happen here: a failed call is
//! reported once and the caller decides what to do.

mod error;
mod http;

use llmr_report::Report;

pub use error::{ClientError, Operation};
pub use http::{HttpOptions, HttpReportApi};

/// Result of a single status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The report is ready; body already normalized.
    Ready(Report),
    /// Still processing (HTTP 202).
    Pending,
    Failed(ClientError),
}

/// Report generation endpoints for one backend.
#[async_trait::async_trait]
pub trait ReportApi: Send + Sync {
    /// Ask the backend to start generating the report for `room_id`.
    ///
    /// Exactly one request; does not wait for the report.
    async fn trigger(&self, room_id: &str) -> Result<(), ClientError>;

    /// Query the report status for `room_id` once.
    async fn fetch_once(&self, room_id: &str) -> PollOutcome;
}
