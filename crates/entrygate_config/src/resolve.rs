//! Layering of file, environment, and command-line settings.
//!
//! Precedence, lowest first: built-in defaults, the `[cache]` table, the
//! environment (`CACHE_DIR`, `USE_HASH_CACHE`, `NODE_ENV`), then flags.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::{BuildMode, CacheConfig, CacheSection};

/// Cache settings read from the process environment.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    /// `CACHE_DIR`: root cache directory.
    pub cache_dir: Option<String>,
    /// `USE_HASH_CACHE`: `1` enables the cache, any other integer disables it.
    pub use_hash_cache: Option<String>,
    /// `NODE_ENV`: `production` selects production mode.
    pub node_env: Option<String>,
}

impl EnvOverrides {
    /// Reads the overrides from the current process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the overrides through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            cache_dir: non_empty("CACHE_DIR"),
            use_hash_cache: non_empty("USE_HASH_CACHE"),
            node_env: non_empty("NODE_ENV"),
        }
    }
}

/// Cache settings given on the command line.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// `--cache-dir`.
    pub cache_dir: Option<PathBuf>,
    /// `--no-cache`.
    pub disable: bool,
}

/// Folds every configuration source into a validated [`CacheConfig`].
///
/// Returns [`ConfigError::MissingField`] when the cache ends up enabled but
/// no source supplied a directory.
pub fn resolve_cache_config(
    section: &CacheSection,
    env: &EnvOverrides,
    cli: &CliOverrides,
) -> Result<CacheConfig, ConfigError> {
    let mode = match env.node_env.as_deref() {
        Some(value) if value.trim() == "production" => BuildMode::Production,
        Some(_) => BuildMode::Development,
        None => section.mode,
    };

    let mut enabled = section.enabled.unwrap_or(mode != BuildMode::Production);
    if let Some(raw) = env.use_hash_cache.as_deref() {
        let flag: i64 = raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("USE_HASH_CACHE must be an integer, got '{raw}'"))
        })?;
        enabled = flag == 1 && mode != BuildMode::Production;
    }
    if cli.disable {
        enabled = false;
    }

    let cache_directory = cli
        .cache_dir
        .clone()
        .or_else(|| env.cache_dir.as_ref().map(PathBuf::from))
        .or_else(|| section.directory.clone());

    if enabled && cache_directory.is_none() {
        return Err(ConfigError::MissingField("cache.directory".to_string()));
    }

    Ok(CacheConfig {
        cache_directory,
        enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(directory: Option<&str>) -> CacheSection {
        CacheSection {
            directory: directory.map(PathBuf::from),
            ..CacheSection::default()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> EnvOverrides {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvOverrides::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn enabled_by_default_outside_production() {
        let config =
            resolve_cache_config(&section(Some("/c")), &env(&[]), &CliOverrides::default())
                .unwrap();
        assert!(config.enabled);
        assert_eq!(config.cache_directory, Some(PathBuf::from("/c")));
    }

    #[test]
    fn disabled_by_default_in_production_mode() {
        let mut s = section(Some("/c"));
        s.mode = BuildMode::Production;
        let config = resolve_cache_config(&s, &env(&[]), &CliOverrides::default()).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn node_env_production_disables() {
        let config = resolve_cache_config(
            &section(Some("/c")),
            &env(&[("NODE_ENV", "production")]),
            &CliOverrides::default(),
        )
        .unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn explicit_enable_wins_over_production_default() {
        let mut s = section(Some("/c"));
        s.mode = BuildMode::Production;
        s.enabled = Some(true);
        let config = resolve_cache_config(&s, &env(&[]), &CliOverrides::default()).unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn use_hash_cache_zero_disables() {
        let config = resolve_cache_config(
            &section(Some("/c")),
            &env(&[("USE_HASH_CACHE", "0")]),
            &CliOverrides::default(),
        )
        .unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn use_hash_cache_one_still_off_in_production() {
        let config = resolve_cache_config(
            &section(Some("/c")),
            &env(&[("USE_HASH_CACHE", "1"), ("NODE_ENV", "production")]),
            &CliOverrides::default(),
        )
        .unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn use_hash_cache_non_integer_errors() {
        let err = resolve_cache_config(
            &section(Some("/c")),
            &env(&[("USE_HASH_CACHE", "yes")]),
            &CliOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_directory_is_fatal_when_enabled() {
        let err =
            resolve_cache_config(&section(None), &env(&[]), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "cache.directory"));
    }

    #[test]
    fn missing_directory_is_fine_when_disabled() {
        let cli = CliOverrides {
            cache_dir: None,
            disable: true,
        };
        let config = resolve_cache_config(&section(None), &env(&[]), &cli).unwrap();
        assert!(!config.enabled);
        assert!(config.cache_directory.is_none());
    }

    #[test]
    fn directory_precedence_cli_over_env_over_file() {
        let from_env = resolve_cache_config(
            &section(Some("/file")),
            &env(&[("CACHE_DIR", "/env")]),
            &CliOverrides::default(),
        )
        .unwrap();
        assert_eq!(from_env.cache_directory, Some(PathBuf::from("/env")));

        let cli = CliOverrides {
            cache_dir: Some(PathBuf::from("/cli")),
            disable: false,
        };
        let from_cli =
            resolve_cache_config(&section(Some("/file")), &env(&[("CACHE_DIR", "/env")]), &cli)
                .unwrap();
        assert_eq!(from_cli.cache_directory, Some(PathBuf::from("/cli")));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let overrides = env(&[("CACHE_DIR", "  "), ("USE_HASH_CACHE", "")]);
        assert!(overrides.cache_dir.is_none());
        assert!(overrides.use_hash_cache.is_none());
    }
}
