//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name of the configuration file within a project directory.
pub const CONFIG_FILE: &str = "entrygate.toml";

/// Loads `<project_dir>/entrygate.toml`.
///
/// A project without a configuration file gets the default configuration;
/// environment variables and flags can still supply every setting.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(ProjectConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads a configuration file from an explicit path.
///
/// A relative `cache.directory` is resolved against the file's parent
/// directory, so the cache location does not depend on the working directory.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = load_config_from_str(&content)?;
    if let Some(dir) = config.cache.directory.as_mut() {
        if dir.is_relative() {
            if let Some(base) = path.parent() {
                *dir = base.join(&*dir);
            }
        }
    }
    Ok(config)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if let Some(dir) = &config.cache.directory {
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "cache.directory must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}
