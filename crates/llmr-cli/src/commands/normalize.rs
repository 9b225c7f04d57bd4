use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

pub fn run(path: Option<&Path>) -> Result<()> {
    let raw = match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("read payload: {}", p.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .context("read payload from stdin")?;
            s
        }
    };

    let payload: Value = serde_json::from_str(&raw).context("parse payload json")?;
    let report = llmr_report::normalize(&payload);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize report")?
    );
    Ok(())
}
