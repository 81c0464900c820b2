//! Host-facing hook points around a build.

use std::collections::BTreeMap;

use entrygate_common::EntryName;
use entrygate_config::CacheConfig;
use entrygate_graph::{Compilation, EntryGraphWalker};
use entrygate_store::{FingerprintStore, FsFingerprintStore};

use crate::error::GateError;
use crate::gate::{CacheGate, CommitReport, FilterReport};

/// What the host should do after the before-build hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDecision {
    /// Compile the (possibly reduced) entry set.
    Proceed(FilterReport),
    /// Nothing to compile; terminate with this exit code.
    Exit {
        /// Process exit code, always 0.
        code: i32,
    },
}

/// Binds a [`CacheGate`] to the host's before-build and after-build hooks.
pub struct CacheHooks<S = FsFingerprintStore> {
    gate: CacheGate<S>,
}

impl CacheHooks<FsFingerprintStore> {
    /// Creates hooks backed by the directory store named in `config`.
    pub fn from_config(config: CacheConfig) -> Result<Self, GateError> {
        Ok(Self::new(CacheGate::from_config(config)?))
    }
}

impl<S: FingerprintStore> CacheHooks<S> {
    /// Wraps an existing gate.
    pub fn new(gate: CacheGate<S>) -> Self {
        Self { gate }
    }

    /// The underlying gate.
    pub fn gate(&self) -> &CacheGate<S> {
        &self.gate
    }

    /// Before-build hook: removes unchanged entries from `entries` in place.
    ///
    /// Returns [`BuildDecision::Exit`] with code 0 when nothing is left to
    /// build, in which case the host must not invoke the compiler.
    pub fn before_build<T>(&mut self, entries: &mut BTreeMap<EntryName, T>) -> BuildDecision {
        let report = self.gate.filter(entries);
        if report.nothing_to_build() {
            BuildDecision::Exit { code: 0 }
        } else {
            BuildDecision::Proceed(report)
        }
    }

    /// After-build hook: resolves every entry's fileset and commits it.
    ///
    /// Returns once the records are durable or the write has failed. Errors
    /// must be reported but must not fail the build.
    pub fn after_build(&mut self, compilation: &Compilation) -> Result<CommitReport, GateError> {
        if !self.gate.is_enabled() {
            return Ok(CommitReport::default());
        }
        let filesets = EntryGraphWalker::new(compilation).entry_filesets()?;
        self.gate.commit(&filesets)
    }
}
