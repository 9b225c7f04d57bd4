use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How urgently a point should be looked at.
///
/// Anything outside the four known values collapses to [`Severity::Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    /// Validate a severity name. Unknown names become `Info`.
    pub fn parse(s: &str) -> Self {
        match s {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Info,
        }
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// Which section of the report a point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Caution,
    Good,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Caution => "caution",
            PointKind::Good => "good",
        }
    }

    /// Severity used when a point carries no usable color.
    pub fn default_severity(&self) -> Severity {
        match self {
            PointKind::Caution => Severity::Medium,
            PointKind::Good => Severity::Info,
        }
    }
}

/// A single caution or good point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub title: String,
    pub detail: String,
    pub severity: Severity,
    pub kind: PointKind,
}

// ---------------------------------------------------------------------------
// Glossary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub term: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Canonical analysis report for one room.
///
/// Built only by [`crate::normalize`]; never mutated afterwards. A newer
/// report replaces an older one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Correlation key. Empty when the payload carried no id at all.
    pub room_id: String,
    pub report_id: Option<String>,
    pub user_id: Option<String>,
    /// Upstream status string; `"done"` when omitted.
    pub status: String,
    pub summary: Option<String>,
    pub caution_points: Vec<Point>,
    pub good_points: Vec<Point>,
    pub created_at: DateTime<Utc>,
    pub glossary: Vec<GlossaryItem>,
}

impl Report {
    /// Identity used to match this report against an active session:
    /// `room_id` if non-empty, else `report_id`.
    pub fn correlation_id(&self) -> Option<&str> {
        if !self.room_id.is_empty() {
            return Some(self.room_id.as_str());
        }
        self.report_id.as_deref().filter(|s| !s.is_empty())
    }
}
