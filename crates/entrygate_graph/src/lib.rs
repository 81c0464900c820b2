//! Host compilation model and entry fileset resolution.
//!
//! [`Compilation`] is the plain-data view of a finished bundler run: entry
//! points, the chunk group graph, and the chunks and modules it owns. The
//! [`EntryGraphWalker`] flattens that graph per entry and collects the source
//! files that contributed to each one.

#![warn(missing_docs)]

pub mod compilation;
pub mod error;
pub mod walker;

pub use compilation::{Chunk, ChunkGroup, ChunkId, Compilation, GroupId, Module, SourceMap};
pub use error::GraphError;
pub use walker::{EntryFileset, EntryGraphWalker};
