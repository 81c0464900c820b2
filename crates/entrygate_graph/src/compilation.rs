//! Plain-data view of a finished host compilation.
//!
//! The host bundler exports its result as camelCase JSON: a map of entry
//! points to root chunk groups, the chunk groups themselves, and the chunks
//! they own. Chunks are stored once and referenced by id because one chunk
//! may be shared by several groups.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use entrygate_common::EntryName;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Debug identifier of a chunk group, unique within one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a chunk, unique within one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub String);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChunkId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A node of the chunk group graph.
///
/// `children` is `None` when the host exported a group without a children
/// list, which is malformed and rejected during traversal. An empty list is
/// a leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkGroup {
    /// Debug identifier.
    pub id: GroupId,
    /// Chunks owned by this group.
    #[serde(default)]
    pub chunks: Vec<ChunkId>,
    /// Child groups (shared children make this a graph).
    #[serde(default)]
    pub children: Option<Vec<GroupId>>,
}

/// A unit of compiled output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Chunk identifier.
    pub id: ChunkId,
    /// Hash of the chunk's rendered output.
    #[serde(default)]
    pub rendered_hash: Option<String>,
    /// Modules compiled into this chunk.
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// A compiled module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Primary resource path, absent for virtual modules.
    #[serde(default)]
    pub resource: Option<String>,
    /// Source map of the module, if the loader chain produced one.
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

/// The part of a module's source map that names original files.
///
/// `sources` is kept as raw JSON: hosts have been seen exporting strings or
/// objects here, and only a list counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    /// Original (pre-transform) source paths.
    #[serde(default)]
    pub sources: Option<serde_json::Value>,
}

/// Wire shape of the compilation export.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilationExport {
    #[serde(default)]
    entrypoints: BTreeMap<EntryName, GroupId>,
    #[serde(default)]
    chunk_groups: Vec<ChunkGroup>,
    #[serde(default)]
    chunks: Vec<Chunk>,
}

/// An indexed, read-only compilation result.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(try_from = "CompilationExport")]
pub struct Compilation {
    entrypoints: BTreeMap<EntryName, GroupId>,
    groups: HashMap<GroupId, ChunkGroup>,
    chunks: HashMap<ChunkId, Chunk>,
}

impl TryFrom<CompilationExport> for Compilation {
    type Error = GraphError;

    fn try_from(export: CompilationExport) -> Result<Self, Self::Error> {
        let mut compilation = Compilation::new();
        for chunk in export.chunks {
            compilation.add_chunk(chunk)?;
        }
        for group in export.chunk_groups {
            compilation.add_group(group)?;
        }
        for (name, group) in export.entrypoints {
            compilation.add_entrypoint(name, group);
        }
        Ok(compilation)
    }
}

impl Compilation {
    /// Creates an empty compilation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a compilation export from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Parse {
            reason: e.to_string(),
        })
    }

    /// Reads a compilation export from a JSON file.
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    /// Adds a chunk. Fails if the id is already taken.
    pub fn add_chunk(&mut self, chunk: Chunk) -> Result<(), GraphError> {
        if self.chunks.contains_key(&chunk.id) {
            return Err(GraphError::DuplicateChunk(chunk.id));
        }
        self.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    /// Adds a chunk group. Fails if the debug id is already taken.
    pub fn add_group(&mut self, group: ChunkGroup) -> Result<(), GraphError> {
        if self.groups.contains_key(&group.id) {
            return Err(GraphError::DuplicateGroup(group.id));
        }
        self.groups.insert(group.id, group);
        Ok(())
    }

    /// Registers `group` as the root chunk group of entry `name`.
    pub fn add_entrypoint(&mut self, name: impl Into<EntryName>, group: GroupId) {
        self.entrypoints.insert(name.into(), group);
    }

    /// Entry points mapped to their root chunk groups.
    pub fn entrypoints(&self) -> &BTreeMap<EntryName, GroupId> {
        &self.entrypoints
    }

    /// Looks up a chunk group by debug id.
    pub fn group(&self, id: GroupId) -> Result<&ChunkGroup, GraphError> {
        self.groups.get(&id).ok_or(GraphError::UnknownGroup(id))
    }

    /// Looks up a chunk by id.
    pub fn chunk(&self, id: &ChunkId) -> Result<&Chunk, GraphError> {
        self.chunks
            .get(id)
            .ok_or_else(|| GraphError::UnknownChunk(id.clone()))
    }

    /// Number of chunk groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
