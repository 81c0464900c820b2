//! Configuration types deserialized from `entrygate.toml` and the resolved form.

use serde::Deserialize;
use std::path::PathBuf;

/// Name of the subdirectory of the cache directory that holds entry records.
pub const STORE_SUBDIR: &str = "entry-fingerprints";

/// The top-level configuration parsed from `entrygate.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheSection,
}

/// The `[cache]` table as written in the file, before any overrides.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Root cache directory. Relative paths are resolved against the
    /// directory containing the configuration file.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Explicit enable switch. When absent, the cache is enabled outside
    /// production mode.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// The build mode the host is running in.
    #[serde(default)]
    pub mode: BuildMode,
}

/// Build mode of the host bundler.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Local and CI development builds. Caching defaults to on.
    #[default]
    Development,
    /// Release builds. Caching defaults to off.
    Production,
}

/// Fully resolved cache configuration handed to the cache gate.
///
/// When `enabled` is true, `cache_directory` is guaranteed to be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root cache directory, if one was configured.
    pub cache_directory: Option<PathBuf>,
    /// Whether the cache gate filters and commits at all.
    pub enabled: bool,
}

impl CacheConfig {
    /// An enabled configuration rooted at `cache_directory`.
    pub fn enabled(cache_directory: impl Into<PathBuf>) -> Self {
        Self {
            cache_directory: Some(cache_directory.into()),
            enabled: true,
        }
    }

    /// A configuration that turns the cache gate into a pass-through.
    pub fn disabled() -> Self {
        Self {
            cache_directory: None,
            enabled: false,
        }
    }

    /// Directory holding the per-entry fingerprint records.
    pub fn store_dir(&self) -> Option<PathBuf> {
        self.cache_directory
            .as_ref()
            .map(|dir| dir.join(STORE_SUBDIR))
    }
}
