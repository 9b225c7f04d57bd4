//! Test support for the report engine.
//!
//! - [`ScriptedReportApi`]: in-memory [`ReportApi`] with scripted answers and
//!   call recording.
//! - Payload builders and fixture loading for the shapes the backend and the
//!   push channel send.

mod scripted_api;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub use scripted_api::ScriptedReportApi;

/// Directory holding the JSON fixtures shipped with this crate.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

pub fn load_payload_json(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).with_context(|| format!("read payload: {}", path.display()))?;
    let v: Value = serde_json::from_str(&s).context("parse payload json")?;
    Ok(v)
}

/// Load a fixture by file name from [`fixtures_dir`].
pub fn fixture(name: &str) -> Result<Value> {
    load_payload_json(fixtures_dir().join(name))
}

/// Report body with one red caution point titled `A`.
pub fn single_caution_payload(room_id: &str) -> Value {
    json!({
        "room_id": room_id,
        "detail": { "caution_points": [{ "title": "A", "color": "red" }] }
    })
}

/// Report body with one glossary item that has no `id`.
pub fn glossary_payload(room_id: &str, term: &str, description: &str) -> Value {
    json!({
        "roomId": room_id,
        "status": "done",
        "detail": {
            "summary": "ok",
            "glossary": [{ "term": term, "description": description }]
        }
    })
}

pub fn progress_payload(room_id: &str, stage: &str) -> Value {
    json!({ "room_id": room_id, "stage": stage })
}

pub fn error_payload(room_id: &str, message: &str) -> Value {
    json!({ "room_id": room_id, "message": message })
}
