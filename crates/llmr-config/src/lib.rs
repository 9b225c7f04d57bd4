//! llmr-config
//!
//! Layered YAML configuration.
//!
//! Pipeline: YAML layers (later overrides earlier, maps merged deeply) ->
//! environment overrides -> secret-literal guard -> canonical JSON + SHA-256
//! hash. The hash identifies the effective config in logs.

mod secrets;
mod settings;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use settings::{ApiConfig, AppConfig, EngineConfig, PushConfig};

/// Known secret-like prefixes. A leaf string starting with one of these
/// aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
    "eyJ",        // bare JWT
];

/// Environment variables that override a config pointer.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LLMR_BASE_URL", "/api/base_url"),
    ("LLMR_PUSH_URL", "/push/url"),
    ("LLMR_POLL_INTERVAL_MS", "/engine/poll_interval_ms"),
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the effective config.
    pub fn app_config(&self) -> Result<AppConfig> {
        AppConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    load_layered_yaml_with_env(paths, |_| None)
}

/// Load YAML files, then apply [`ENV_OVERRIDES`] through `env`.
pub fn load_layered_yaml_with_env<F>(paths: &[&str], env: F) -> Result<LoadedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings_with_env(&doc_refs, env)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    load_layered_yaml_from_strings_with_env(yaml_docs, |_| None)
}

pub fn load_layered_yaml_from_strings_with_env<F>(
    yaml_docs: &[&str],
    env: F,
) -> Result<LoadedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document parses as null; treat it as an empty layer.
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    apply_env_overrides(&mut merged, env)?;

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn apply_env_overrides<F>(merged: &mut Value, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, ptr) in ENV_OVERRIDES {
        let Some(raw) = env(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let raw = raw.trim();
        let value = if ptr.ends_with("_ms") {
            let n: u64 = raw
                .parse()
                .with_context(|| format!("{var} must be a non-negative integer, got {raw:?}"))?;
            Value::from(n)
        } else {
            Value::from(raw)
        };
        set_pointer(merged, ptr, value);
    }
    Ok(())
}

/// Set `ptr` to `value`, replacing non-object parents with objects.
fn set_pointer(root: &mut Value, ptr: &str, value: Value) {
    let tokens: Vec<&str> = ptr.trim_start_matches('/').split('/').collect();
    let Some((last, parents)) = tokens.split_last() else {
        return;
    };

    let mut cur = root;
    for tok in parents {
        if !cur.is_object() {
            *cur = Value::Object(serde_json::Map::new());
        }
        cur = &mut cur[*tok];
    }
    if !cur.is_object() {
        *cur = Value::Object(serde_json::Map::new());
    }
    cur[*last] = value;
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json::Map is key-sorted, so compact serialization is canonical.
    let s = serde_json::to_string(v).context("canonical json serialize failed")?;
    Ok(s)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    hex::encode(out)
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}
