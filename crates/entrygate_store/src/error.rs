//! Error types for fingerprint store operations.

use std::path::PathBuf;

use entrygate_common::EntryName;

/// Errors that can occur during store operations.
///
/// Reads are fail-open: callers treat a failed lookup as an empty store, so
/// every entry is rebuilt. Write failures are surfaced so a cache that stops
/// shrinking build sets can be diagnosed.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing store files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A record file could not be parsed.
    #[error("failed to parse cache record {path}: {reason}")]
    RecordParse {
        /// The record file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A source file was modified while it was being hashed.
    #[error("{} changed while it was being hashed", .path.display())]
    Unstable {
        /// The file being hashed.
        path: PathBuf,
    },

    /// A record could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// Some records of an upsert batch were not written.
    #[error("failed to persist {} cache record(s) ({}): {source}", .failed.len(), join_names(.failed))]
    Upsert {
        /// Entries whose previous record (if any) was left in place.
        failed: Vec<EntryName>,
        /// The first underlying failure.
        source: Box<CacheError>,
    },
}

fn join_names(names: &[EntryName]) -> String {
    names
        .iter()
        .map(EntryName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
