use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use llmr_client::{HttpOptions, HttpReportApi};
use llmr_engine::{Engine, EngineOptions, Status};
use llmr_push::{PushHub, WsPushSource};
use tracing::{info, warn};

pub struct GenerateArgs {
    pub room_id: String,
    pub config_paths: Vec<String>,
    pub no_push: bool,
    pub timeout_secs: u64,
}

/// Run one session to completion and print the report.
pub async fn run(args: GenerateArgs) -> Result<()> {
    let loaded = super::load_config(&args.config_paths)?;
    let cfg = loaded.app_config()?;
    let secrets = llmr_config::resolve_secrets(&cfg, |k| std::env::var(k).ok())?;
    info!(config_hash = %loaded.config_hash, base_url = %cfg.api.base_url, "config loaded");

    let api = HttpReportApi::with_options(
        &cfg.api.base_url,
        HttpOptions {
            bearer_token: secrets.api_token.clone(),
            timeout: cfg.api.request_timeout(),
        },
    )
    .context("build report api client")?;

    let hub = PushHub::new();
    // A failed connect falls back to polling only.
    let push = match cfg.push.active_url().filter(|_| !args.no_push) {
        Some(url) => match WsPushSource::connect(url, hub.clone()).await {
            Ok(src) => Some(src),
            Err(e) => {
                warn!(error = %e, "push channel unavailable, polling only");
                None
            }
        },
        None => None,
    };

    let mut engine = Engine::spawn(
        Arc::new(api),
        &hub,
        EngineOptions {
            poll_interval: cfg.engine.poll_interval(),
        },
    );

    let generation = engine.start(&args.room_id).await?;
    let waited = tokio::time::timeout(
        Duration::from_secs(args.timeout_secs),
        engine.wait_for_terminal(generation),
    )
    .await;
    engine.shutdown().await;

    if let Some(src) = push.as_ref().filter(|src| src.is_closed()) {
        warn!(url = src.url(), "push channel closed before the session finished");
    }

    let snap = match waited {
        Ok(res) => res?,
        Err(_) => bail!(
            "timed out after {}s waiting for report {}",
            args.timeout_secs,
            args.room_id.trim()
        ),
    };

    match (snap.status, snap.report) {
        (Status::Done, Some(report)) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("serialize report")?
            );
            Ok(())
        }
        _ => bail!(
            "report generation failed: {}",
            snap.last_error
                .map(|f| f.to_string())
                .unwrap_or_else(|| "no report".to_string())
        ),
    }
}
