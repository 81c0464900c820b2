//! Error types for reading and traversing a host compilation.

use std::path::PathBuf;

use entrygate_common::EntryName;

use crate::compilation::{ChunkId, GroupId};

/// Errors raised when the host compilation is malformed.
///
/// These abort the commit step only; entries that were already built are
/// unaffected, and without a commit they are simply rebuilt next time.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The compilation export could not be read.
    #[error("failed to read compilation at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compilation export is not valid JSON of the expected shape.
    #[error("failed to parse compilation: {reason}")]
    Parse {
        /// Description of the parse failure.
        reason: String,
    },

    /// A chunk group id was referenced but never defined.
    #[error("unknown chunk group {0}")]
    UnknownGroup(GroupId),

    /// A chunk id was referenced by a group but never defined.
    #[error("unknown chunk '{0}'")]
    UnknownChunk(ChunkId),

    /// An entry point names a chunk group that does not exist.
    #[error("entry '{entry}' points at unknown chunk group {group}")]
    UnknownEntryGroup {
        /// The entry whose root is missing.
        entry: EntryName,
        /// The missing group id.
        group: GroupId,
    },

    /// A chunk group carries no children list at all.
    #[error("chunk group {0} has no children list")]
    MissingChildren(GroupId),

    /// Two chunk groups share a debug id.
    #[error("duplicate chunk group {0}")]
    DuplicateGroup(GroupId),

    /// Two chunks share an id.
    #[error("duplicate chunk '{0}'")]
    DuplicateChunk(ChunkId),
}
