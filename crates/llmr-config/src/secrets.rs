//! Runtime secret resolution.
//!
//! Config stores only env var NAMES (`api.token_env`). Callers resolve them
//! once at startup and pass [`ResolvedSecrets`] into constructors. Errors
//! reference the variable name, never the value. `Debug` redacts values.

use anyhow::{bail, Result};

use crate::AppConfig;

#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Bearer token for the report API. `None` if no env var is configured.
    pub api_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve secrets named by `cfg` through `env`.
///
/// A configured but unset (or empty) variable is an error.
pub fn resolve_secrets<F>(cfg: &AppConfig, env: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let api_token = match cfg
        .api
        .token_env
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        None => None,
        Some(name) => match env(name).filter(|v| !v.trim().is_empty()) {
            Some(v) => Some(v),
            None => bail!("SECRET_MISSING env var {name} (api.token_env) is not set"),
        },
    };

    Ok(ResolvedSecrets { api_token })
}
