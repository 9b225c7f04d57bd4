pub mod generate;
pub mod normalize;

use anyhow::Result;
use llmr_config::LoadedConfig;

/// Layered config from `paths` with process env overrides applied.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    llmr_config::load_layered_yaml_with_env(&path_refs, |k| std::env::var(k).ok())
}
