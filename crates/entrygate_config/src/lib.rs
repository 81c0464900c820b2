//! Parsing and resolution of the `entrygate.toml` cache configuration.
//!
//! The file contributes a `[cache]` table; environment variables and command
//! line flags layer on top of it. [`resolve_cache_config`] folds all sources
//! into the validated [`CacheConfig`] handed to the cache gate.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_cache_config, CliOverrides, EnvOverrides};
pub use types::*;
