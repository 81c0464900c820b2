//! Configuration errors. All of them are fatal and surface before a build starts.

use std::path::PathBuf;

/// Errors raised while loading or resolving the cache configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unexpected keys.
    #[error("invalid entrygate.toml: {0}")]
    ParseError(String),

    /// The cache is enabled but a required setting has no value in any source.
    #[error("cache is enabled but {0} is not set")]
    MissingField(String),

    /// A setting has a value outside its allowed range.
    #[error("invalid cache setting: {0}")]
    ValidationError(String),
}
