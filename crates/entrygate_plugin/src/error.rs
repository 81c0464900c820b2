//! Error types for the cache gate.

use entrygate_config::ConfigError;
use entrygate_graph::GraphError;
use entrygate_store::CacheError;

/// Errors surfaced by the cache gate and its hooks.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The cache configuration is invalid. Fatal, raised before any build work.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persisting fingerprints failed after a successful build. The build
    /// stands; the affected entries are rebuilt next time.
    #[error("cache store failure: {0}")]
    Store(#[from] CacheError),

    /// The host compilation is malformed, so no fingerprints were committed.
    #[error("malformed compilation: {0}")]
    Graph(#[from] GraphError),
}
