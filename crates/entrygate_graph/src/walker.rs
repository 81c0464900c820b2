//! Chunk group traversal and per-entry fileset collection.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use entrygate_common::EntryName;
use serde_json::Value;

use crate::compilation::{Chunk, Compilation, GroupId, Module};
use crate::error::GraphError;

/// The source files that contributed to one build entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFileset {
    /// The entry name.
    pub name: EntryName,
    /// Contributing files in traversal order. Duplicates across modules are
    /// kept; the store deduplicates when it captures a fingerprint.
    pub files: Vec<PathBuf>,
    /// Rendered hash of the last chunk processed for this entry.
    pub hash: Option<String>,
}

/// Walks the chunk group graph of one compilation.
pub struct EntryGraphWalker<'c> {
    compilation: &'c Compilation,
}

impl<'c> EntryGraphWalker<'c> {
    /// Creates a walker over `compilation`.
    pub fn new(compilation: &'c Compilation) -> Self {
        Self { compilation }
    }

    /// Flattens the graph reachable from `roots` into the chunks it owns.
    ///
    /// Depth-first, most recently discovered group first. Each distinct group
    /// is expanded exactly once, so shared children and cycles contribute
    /// their chunks a single time and the walk terminates.
    pub fn chunks_of(&self, roots: &[GroupId]) -> Result<Vec<&'c Chunk>, GraphError> {
        let mut result = Vec::new();
        let mut visited: HashSet<GroupId> = HashSet::new();
        let mut stack: Vec<GroupId> = roots.to_vec();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let group = self.compilation.group(id)?;
            for chunk_id in &group.chunks {
                result.push(self.compilation.chunk(chunk_id)?);
            }
            let children = group
                .children
                .as_ref()
                .ok_or(GraphError::MissingChildren(id))?;
            stack.extend(children.iter().filter(|child| !visited.contains(*child)));
        }

        Ok(result)
    }

    /// Collects the fileset of every entry in `entry_points`.
    ///
    /// Every entry appears in the output, including entries whose chunks own
    /// no modules.
    pub fn filesets_of(
        &self,
        entry_points: &BTreeMap<EntryName, GroupId>,
    ) -> Result<Vec<EntryFileset>, GraphError> {
        entry_points
            .iter()
            .map(|(name, root)| self.fileset_of(name, *root))
            .collect()
    }

    /// Collects the fileset of every entry point of the compilation.
    pub fn entry_filesets(&self) -> Result<Vec<EntryFileset>, GraphError> {
        self.filesets_of(self.compilation.entrypoints())
    }

    fn fileset_of(&self, name: &EntryName, root: GroupId) -> Result<EntryFileset, GraphError> {
        self.compilation
            .group(root)
            .map_err(|_| GraphError::UnknownEntryGroup {
                entry: name.clone(),
                group: root,
            })?;

        let mut files = Vec::new();
        let mut hash = None;
        for chunk in self.chunks_of(&[root])? {
            hash = chunk.rendered_hash.clone();
            for module in &chunk.modules {
                collect_module_files(module, &mut files);
            }
        }

        tracing::debug!(entry = %name, files = files.len(), "resolved entry fileset");
        Ok(EntryFileset {
            name: name.clone(),
            files,
            hash,
        })
    }
}

/// Appends the module's source-map sources, then its resource path.
fn collect_module_files(module: &Module, files: &mut Vec<PathBuf>) {
    if let Some(source_map) = &module.source_map {
        if let Some(sources) = &source_map.sources {
            if let Value::Array(items) = sources {
                files.extend(items.iter().filter_map(Value::as_str).map(PathBuf::from));
            }
        }
    }
    if let Some(resource) = &module.resource {
        files.push(PathBuf::from(resource));
    }
}
