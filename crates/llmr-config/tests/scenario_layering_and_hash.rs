//! Scenario: layered YAML, env overrides, stable hash
//!
//! GREEN when:
//! - Later layers override earlier ones; untouched siblings survive.
//! - Key order in the source YAML does not change the hash.
//! - Env overrides apply after layering and change the hash.
//! - A non-numeric poll interval override is rejected.
//! - The shipped base.yaml loads into a valid typed config.

use llmr_config::{
    load_layered_yaml, load_layered_yaml_from_strings, load_layered_yaml_from_strings_with_env,
};
use std::time::Duration;

const BASE_YAML: &str = r#"
api:
  base_url: "http://reports.internal:8000"
  token_env: "LLMR_API_TOKEN"
  request_timeout_ms: 10000
push:
  enabled: true
  url: "ws://reports.internal:8000/ws"
engine:
  poll_interval_ms: 3000
"#;

const BASE_YAML_REORDERED: &str = r#"
engine:
  poll_interval_ms: 3000
push:
  url: "ws://reports.internal:8000/ws"
  enabled: true
api:
  request_timeout_ms: 10000
  token_env: "LLMR_API_TOKEN"
  base_url: "http://reports.internal:8000"
"#;

const OVERLAY_YAML: &str = r#"
push:
  enabled: false
engine:
  poll_interval_ms: 500
"#;

#[test]
fn overlay_overrides_and_keeps_siblings() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let cfg = loaded.app_config().unwrap();

    assert_eq!(cfg.engine.poll_interval(), Duration::from_millis(500));
    assert!(!cfg.push.enabled);
    assert_eq!(cfg.push.url.as_deref(), Some("ws://reports.internal:8000/ws"));
    assert_eq!(cfg.api.base_url, "http://reports.internal:8000");
    assert_eq!(cfg.api.token_env.as_deref(), Some("LLMR_API_TOKEN"));
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64);
    assert!(a.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn env_overrides_apply_last_and_change_hash() {
    let plain = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let overridden = load_layered_yaml_from_strings_with_env(&[BASE_YAML], |k| match k {
        "LLMR_BASE_URL" => Some("https://reports.example.com".to_string()),
        "LLMR_POLL_INTERVAL_MS" => Some(" 1500 ".to_string()),
        "LLMR_PUSH_URL" => Some("   ".to_string()),
        _ => None,
    })
    .unwrap();

    let cfg = overridden.app_config().unwrap();
    assert_eq!(cfg.api.base_url, "https://reports.example.com");
    assert_eq!(cfg.engine.poll_interval_ms, 1500);
    // Blank overrides are ignored.
    assert_eq!(cfg.push.url.as_deref(), Some("ws://reports.internal:8000/ws"));

    assert_ne!(plain.config_hash, overridden.config_hash);
}

#[test]
fn env_override_creates_missing_section() {
    let loaded = load_layered_yaml_from_strings_with_env(&["{}"], |k| {
        (k == "LLMR_PUSH_URL").then(|| "ws://localhost:9000/ws".to_string())
    })
    .unwrap();
    assert_eq!(
        loaded.config_json.pointer("/push/url").and_then(|v| v.as_str()),
        Some("ws://localhost:9000/ws")
    );
}

#[test]
fn non_numeric_poll_interval_override_is_rejected() {
    let err = load_layered_yaml_from_strings_with_env(&[BASE_YAML], |k| {
        (k == "LLMR_POLL_INTERVAL_MS").then(|| "fast".to_string())
    })
    .unwrap_err();
    assert!(err.to_string().contains("LLMR_POLL_INTERVAL_MS"));
}

#[test]
fn empty_documents_are_empty_layers() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, ""]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn shipped_base_yaml_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/base.yaml");
    let loaded = load_layered_yaml(&[path]).unwrap();
    let cfg = loaded.app_config().unwrap();
    assert_eq!(cfg.engine.poll_interval_ms, 3000);
    assert!(cfg.push.active_url().is_some());
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}
