//! Canonical normalization for raw report payloads.
//!
//! Converts an arbitrary `serde_json::Value` (poll body or push `llm.result`
//! payload) into a [`Report`]. The conversion is total: every field has a
//! fallback, so malformed, partial or wrongly-typed input still yields a
//! report instead of an error.
//!
//! Key tolerance: each logical field may appear under a lower-camel-case or
//! snake_case key. Candidates are checked in a fixed order and the first one
//! holding a usable value wins.
//!
//! It does **not**:
//! - fetch anything
//! - decide whether a report should be accepted (that is `llmr-reconcile`)

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::types::{GlossaryItem, Point, PointKind, Report, Severity};

// ---------------------------------------------------------------------------
// Key precedence tables
// ---------------------------------------------------------------------------

/// Correlation keys, in precedence order.
pub const ROOM_ID_KEYS: &[&str] = &["roomId", "room_id", "reportId", "report_id"];
const REPORT_ID_KEYS: &[&str] = &["reportId", "report_id"];
const USER_ID_KEYS: &[&str] = &["userId", "user_id"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "created_at"];

const POINT_TITLE_KEYS: &[&str] = &["title"];
const POINT_DETAIL_KEYS: &[&str] = &["detail", "description"];

const GLOSSARY_TERM_KEYS: &[&str] = &["term", "title"];
const GLOSSARY_DESCRIPTION_KEYS: &[&str] = &["description", "detail", "definition"];

const DEFAULT_STATUS: &str = "done";

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a raw payload, defaulting a missing `createdAt` to now.
pub fn normalize(raw: &Value) -> Report {
    normalize_at(raw, Utc::now())
}

/// Normalize a raw payload with an explicit clock for the `createdAt` default.
///
/// Identical inputs and an identical `now` always produce equal reports. When
/// the payload supplies a parseable `createdAt`, `now` is not consulted.
pub fn normalize_at(raw: &Value, now: DateTime<Utc>) -> Report {
    let empty = Map::new();
    let top = raw.as_object().unwrap_or(&empty);
    let detail = top
        .get("detail")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let caution_points = points_from(detail.get("caution_points"), PointKind::Caution);
    let good_points = points_from(detail.get("good_points"), PointKind::Good);

    let glossary = match (detail.get("glossary"), top.get("glossary")) {
        (Some(Value::Array(items)), _) => glossary_from(items),
        (_, Some(Value::Array(items))) => glossary_from(items),
        _ => Vec::new(),
    };

    let summary = text_field(detail, &["summary"]).or_else(|| text_field(top, &["summary"]));

    Report {
        room_id: text_field(top, ROOM_ID_KEYS).unwrap_or_default(),
        report_id: text_field(top, REPORT_ID_KEYS),
        user_id: text_field(top, USER_ID_KEYS),
        status: text_field(top, &["status"]).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        summary,
        caution_points,
        good_points,
        created_at: created_at_from(top).unwrap_or(now),
        glossary,
    }
}

/// Extract the candidate correlation id from any push payload.
///
/// Uses the same precedence as `roomId` normalization. Non-object payloads and
/// empty ids yield `None`.
pub fn correlation_id(raw: &Value) -> Option<String> {
    raw.as_object()
        .and_then(|obj| text_field(obj, ROOM_ID_KEYS))
        .filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// First candidate key holding a string (or a number, rendered as text).
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn points_from(raw: Option<&Value>, kind: PointKind) -> Vec<Point> {
    match raw {
        Some(Value::Array(items)) => items.iter().filter_map(|p| point_from(p, kind)).collect(),
        _ => Vec::new(),
    }
}

/// `None` when both title and detail are empty: the point is dropped.
fn point_from(raw: &Value, kind: PointKind) -> Option<Point> {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let title = text_field(obj, POINT_TITLE_KEYS).unwrap_or_default();
    let detail = text_field(obj, POINT_DETAIL_KEYS).unwrap_or_default();
    if title.is_empty() && detail.is_empty() {
        return None;
    }

    let name = obj
        .get("color")
        .and_then(Value::as_str)
        .and_then(color_severity)
        .unwrap_or_else(|| kind.default_severity().as_str());
    let severity = Severity::parse(name);

    Some(Point {
        title,
        detail,
        severity,
        kind,
    })
}

/// Fixed color lookup, matched case-insensitively. `None` for unmapped colors.
fn color_severity(color: &str) -> Option<&'static str> {
    match color.trim().to_ascii_lowercase().as_str() {
        "red" => Some("high"),
        "yellow" => Some("medium"),
        "green" => Some("info"),
        _ => None,
    }
}

fn glossary_from(items: &[Value]) -> Vec<GlossaryItem> {
    let empty = Map::new();
    items
        .iter()
        .map(|raw| {
            let obj = raw.as_object().unwrap_or(&empty);
            GlossaryItem {
                id: text_field(obj, &["id"]),
                term: text_field(obj, GLOSSARY_TERM_KEYS).unwrap_or_default(),
                description: text_field(obj, GLOSSARY_DESCRIPTION_KEYS).unwrap_or_default(),
            }
        })
        .collect()
}

fn created_at_from(obj: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let raw = CREATED_AT_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        tracing::debug!(created_at = raw, "unparseable createdAt; using normalization time");
    }
    parsed
}

/// RFC 3339, or a naive ISO-8601 timestamp interpreted as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
