//! Resolves the effective cache configuration from file, environment and flags.

use std::path::Path;

use entrygate_config::{
    load_config, load_config_file, resolve_cache_config, CacheConfig, CliOverrides, EnvOverrides,
};

use crate::GlobalArgs;

/// Resolves the cache configuration for the current process.
///
/// Reads `--config` when given, otherwise `entrygate.toml` in the current
/// directory if one exists, then applies the environment and the CLI flags.
pub fn resolve(global: &GlobalArgs) -> Result<CacheConfig, Box<dyn std::error::Error>> {
    resolve_in(global, &std::env::current_dir()?, &EnvOverrides::from_env())
}

/// Like [`resolve`], with an explicit project directory and environment.
pub fn resolve_in(
    global: &GlobalArgs,
    project_dir: &Path,
    env: &EnvOverrides,
) -> Result<CacheConfig, Box<dyn std::error::Error>> {
    let project = match global.config {
        Some(ref path) => load_config_file(path)?,
        None => load_config(project_dir)?,
    };
    let cli = CliOverrides {
        cache_dir: global.cache_dir.clone(),
        disable: global.no_cache,
    };
    let config = resolve_cache_config(&project.cache, env, &cli)?;
    tracing::debug!(
        enabled = config.enabled,
        directory = ?config.cache_directory,
        "resolved cache configuration"
    );
    Ok(config)
}

#[cfg(test)]
pub(crate) fn test_global(cache_dir: Option<&Path>) -> GlobalArgs {
    GlobalArgs {
        quiet: true,
        verbose: false,
        config: None,
        cache_dir: cache_dir.map(Path::to_path_buf),
        no_cache: false,
    }
}
