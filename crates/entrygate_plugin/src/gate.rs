//! The cache gate: filter before a build, commit after it.
//!
//! The gate never trades correctness for speed. Any failure to read the store
//! fails open (every requested entry is built), and a failure to write it only
//! costs a rebuild of the affected entries next time.

use std::collections::BTreeMap;
use std::time::SystemTime;

use entrygate_common::EntryName;
use entrygate_config::{CacheConfig, ConfigError};
use entrygate_graph::EntryFileset;
use entrygate_store::{CacheRecord, Fingerprint, FingerprintStore, FsFingerprintStore};
use rayon::prelude::*;

use crate::error::GateError;

/// Where the gate is in the filter → build → commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No build in flight.
    Idle,
    /// `filter` has run; the host is compiling.
    Building {
        /// When the build window opened.
        started: SystemTime,
    },
}

/// Outcome of [`CacheGate::filter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Entries removed from the requested set because they are unchanged.
    pub skipped: Vec<EntryName>,
    /// Entries left in the requested set.
    pub to_build: Vec<EntryName>,
}

impl FilterReport {
    /// Returns `true` if no entry requires building.
    pub fn nothing_to_build(&self) -> bool {
        self.to_build.is_empty()
    }
}

/// Outcome of [`CacheGate::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Entries whose record was written.
    pub written: Vec<EntryName>,
    /// Entries with a file modified while the build ran. Their previous record
    /// is kept, so they rebuild next time.
    pub deferred: Vec<EntryName>,
}

/// Filters requested entries against stored fingerprints and records new ones.
pub struct CacheGate<S = FsFingerprintStore> {
    config: CacheConfig,
    store: Option<S>,
    state: GateState,
}

impl CacheGate<FsFingerprintStore> {
    /// Creates a gate backed by the directory store named in `config`.
    pub fn from_config(config: CacheConfig) -> Result<Self, GateError> {
        let store = match (config.enabled, config.store_dir()) {
            (true, Some(dir)) => Some(FsFingerprintStore::new(dir)),
            (true, None) => {
                return Err(ConfigError::MissingField("cache.directory".to_string()).into())
            }
            (false, _) => None,
        };
        Ok(Self {
            config,
            store,
            state: GateState::Idle,
        })
    }
}

impl<S: FingerprintStore> CacheGate<S> {
    /// Creates a gate over an explicit store.
    pub fn with_store(config: CacheConfig, store: S) -> Self {
        Self {
            config,
            store: Some(store),
            state: GateState::Idle,
        }
    }

    /// Whether the gate filters and commits at all.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.store.is_some()
    }

    /// The configuration the gate was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> GateState {
        self.state
    }

    fn active_store(&self) -> Option<&S> {
        self.store.as_ref().filter(|_| self.config.enabled)
    }

    /// Removes every unchanged entry from `requested`.
    ///
    /// Only entries whose stored fingerprint still matches the files on disk
    /// are removed. A store that cannot be read removes nothing.
    pub fn filter<T>(&mut self, requested: &mut BTreeMap<EntryName, T>) -> FilterReport {
        let started = SystemTime::now();
        self.state = GateState::Building { started };

        let mut skipped = Vec::new();
        if let Some(store) = self.active_store() {
            match store.unchanged_entries() {
                Ok(unchanged) => {
                    skipped = unchanged
                        .into_iter()
                        .filter(|name| requested.remove(name).is_some())
                        .collect();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cache lookup failed, building every requested entry");
                }
            }
        }

        let report = FilterReport {
            skipped,
            to_build: requested.keys().cloned().collect(),
        };
        if report.nothing_to_build() {
            tracing::info!(skipped = report.skipped.len(), "no entries require building");
        } else {
            if let Some(store) = self.active_store() {
                if let Err(e) = store.open_build_window(started) {
                    tracing::warn!(error = %e, "failed to record the build window");
                }
            }
            tracing::info!(
                entries = ?report.to_build,
                skipped = report.skipped.len(),
                "building entries"
            );
        }
        report
    }

    /// Records fresh fingerprints for the entries of a successful build.
    ///
    /// A store failure is logged and returned; the caller must not fail the
    /// build on it.
    pub fn commit(&mut self, filesets: &[EntryFileset]) -> Result<CommitReport, GateError> {
        let in_process = match std::mem::replace(&mut self.state, GateState::Idle) {
            GateState::Building { started } => Some(started),
            GateState::Idle => None,
        };
        let Some(store) = self.active_store() else {
            return Ok(CommitReport::default());
        };
        let persisted = store.take_build_window().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "build window unreadable, deferring every record");
            Some(SystemTime::UNIX_EPOCH)
        });
        let started = in_process.or(persisted);

        let captured: Vec<CacheRecord> = filesets
            .par_iter()
            .map(|fileset| {
                CacheRecord::new(
                    fileset.name.clone(),
                    Fingerprint::capture(&fileset.files, fileset.hash.clone()),
                )
            })
            .collect();

        let mut report = CommitReport::default();
        let mut records = Vec::with_capacity(captured.len());
        for record in captured {
            match started {
                Some(started) if record.fingerprint.modified_since(started) => {
                    tracing::warn!(
                        entry = %record.name,
                        "source changed during the build, keeping the previous record"
                    );
                    report.deferred.push(record.name);
                }
                _ => records.push(record),
            }
        }

        if let Err(e) = store.upsert(&records) {
            tracing::warn!(error = %e, "failed to persist entry fingerprints");
            return Err(e.into());
        }
        report.written = records.into_iter().map(|record| record.name).collect();
        tracing::info!(
            written = report.written.len(),
            deferred = report.deferred.len(),
            "committed entry fingerprints"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrygate_store::CacheError;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};

    fn source(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn fileset(name: &str, files: &[PathBuf]) -> EntryFileset {
        EntryFileset {
            name: EntryName::new(name),
            files: files.to_vec(),
            hash: Some(format!("hash-{name}")),
        }
    }

    fn requested(names: &[&str]) -> BTreeMap<EntryName, String> {
        names
            .iter()
            .map(|n| (EntryName::new(*n), format!("./src/{n}.js")))
            .collect()
    }

    fn gate(cache_dir: &Path) -> CacheGate {
        CacheGate::from_config(CacheConfig::enabled(cache_dir)).unwrap()
    }

    /// Store whose writes always fail and whose reads may fail.
    struct BrokenStore {
        inner: FsFingerprintStore,
        fail_reads: bool,
    }

    impl FingerprintStore for BrokenStore {
        fn lookup_all(&self) -> Result<BTreeMap<EntryName, Fingerprint>, CacheError> {
            if self.fail_reads {
                return Err(CacheError::RecordParse {
                    path: self.inner.dir().to_path_buf(),
                    reason: "simulated".to_string(),
                });
            }
            self.inner.lookup_all()
        }

        fn upsert(&self, records: &[CacheRecord]) -> Result<(), CacheError> {
            Err(CacheError::Upsert {
                failed: records.iter().map(|r| r.name.clone()).collect(),
                source: Box::new(CacheError::Serialization {
                    reason: "simulated".to_string(),
                }),
            })
        }
    }

    #[test]
    fn from_config_requires_directory_when_enabled() {
        let config = CacheConfig {
            cache_directory: None,
            enabled: true,
        };
        let err = CacheGate::from_config(config).err().unwrap();
        assert!(matches!(err, GateError::Config(ConfigError::MissingField(_))));
    }

    #[test]
    fn disabled_gate_passes_everything_through() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.js", "a");
        let mut gate = CacheGate::from_config(CacheConfig::disabled()).unwrap();
        assert!(!gate.is_enabled());

        let report = gate.commit(&[fileset("main", &[a])]).unwrap();
        assert!(report.written.is_empty());

        let mut entries = requested(&["main"]);
        let report = gate.filter(&mut entries);
        assert_eq!(entries.len(), 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn empty_cache_builds_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate(&dir.path().join("cache"));
        let mut entries = requested(&["a", "b"]);
        let report = gate.filter(&mut entries);
        assert_eq!(entries.len(), 2);
        assert_eq!(report.to_build.len(), 2);
        assert!(!report.nothing_to_build());
    }

    #[test]
    fn commit_then_filter_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.js", "a");
        let cache = dir.path().join("cache");

        let report = gate(&cache).commit(&[fileset("main", &[a])]).unwrap();
        assert_eq!(report.written, vec![EntryName::new("main")]);

        let mut entries = requested(&["main"]);
        let report = gate(&cache).filter(&mut entries);
        assert!(entries.is_empty());
        assert!(report.nothing_to_build());
        assert_eq!(report.skipped, vec![EntryName::new("main")]);
    }

    #[test]
    fn filter_keeps_changed_and_uncached_entries() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.js", "a");
        let b = source(dir.path(), "b.js", "b");
        let cache = dir.path().join("cache");
        gate(&cache)
            .commit(&[fileset("a", &[a]), fileset("b", &[b.clone()])])
            .unwrap();

        std::fs::write(&b, "b was edited").unwrap();

        let mut entries = requested(&["a", "b", "c"]);
        let report = gate(&cache).filter(&mut entries);
        let left: Vec<&str> = entries.keys().map(EntryName::as_str).collect();
        assert_eq!(left, vec!["b", "c"]);
        assert_eq!(report.skipped, vec![EntryName::new("a")]);
    }

    #[test]
    fn filter_only_removes_requested_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.js", "a");
        let cache = dir.path().join("cache");
        gate(&cache)
            .commit(&[fileset("a", &[a.clone()]), fileset("other", &[a])])
            .unwrap();

        let mut entries = requested(&["a", "b"]);
        let report = gate(&cache).filter(&mut entries);
        assert_eq!(report.skipped, vec![EntryName::new("a")]);
        assert_eq!(report.to_build, vec![EntryName::new("b")]);
    }

    #[test]
    fn unreadable_store_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.js", "a");
        let inner = FsFingerprintStore::new(dir.path().join("store"));
        inner
            .upsert(&[CacheRecord::new(
                EntryName::new("main"),
                Fingerprint::capture(&[a], None),
            )])
            .unwrap();

        let store = BrokenStore {
            inner,
            fail_reads: true,
        };
        let mut gate = CacheGate::with_store(CacheConfig::enabled(dir.path()), store);
        let mut entries = requested(&["main"]);
        gate.filter(&mut entries);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn failed_commit_is_surfaced_and_never_skips() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.js", "a");
        let store = BrokenStore {
            inner: FsFingerprintStore::new(dir.path().join("store")),
            fail_reads: false,
        };
        let mut gate = CacheGate::with_store(CacheConfig::enabled(dir.path()), store);

        let err = gate.commit(&[fileset("main", &[a])]).unwrap_err();
        assert!(matches!(err, GateError::Store(_)));

        let mut entries = requested(&["main"]);
        gate.filter(&mut entries);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn files_edited_during_build_defer_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.js", "a");
        let b = source(dir.path(), "b.js", "b");
        let cache = dir.path().join("cache");
        let mut gate = gate(&cache);

        // Open the build window well before b's latest write.
        gate.state = GateState::Building {
            started: SystemTime::now() + std::time::Duration::from_secs(3600),
        };
        let report = gate.commit(&[fileset("main", &[a])]).unwrap();
        assert_eq!(report.written, vec![EntryName::new("main")]);

        gate.state = GateState::Building {
            started: SystemTime::UNIX_EPOCH,
        };
        let report = gate.commit(&[fileset("admin", &[b])]).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.deferred, vec![EntryName::new("admin")]);

        let store_dir = CacheConfig::enabled(&cache).store_dir().unwrap();
        let stored: BTreeSet<String> = FsFingerprintStore::new(store_dir)
            .lookup_all()
            .unwrap()
            .keys()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(stored, BTreeSet::from(["main".to_string()]));
    }

    #[test]
    fn state_cycles_through_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate(&dir.path().join("cache"));
        assert_eq!(gate.state(), GateState::Idle);
        gate.filter(&mut requested(&["main"]));
        assert!(matches!(gate.state(), GateState::Building { .. }));
        gate.commit(&[]).unwrap();
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn entry_with_no_files_is_never_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        gate(&cache).commit(&[fileset("styles", &[])]).unwrap();

        let mut entries = requested(&["styles"]);
        gate(&cache).filter(&mut entries);
        assert_eq!(entries.len(), 1);
    }

    fn store_of(cache: &Path) -> FsFingerprintStore {
        FsFingerprintStore::new(CacheConfig::enabled(cache).store_dir().unwrap())
    }

    #[test]
    fn build_window_carries_over_to_a_separate_commit() {
        let dir = tempfile::tempdir().unwrap();
        let main = source(dir.path(), "main.js", "v1");
        let cache = dir.path().join("cache");

        let mut entries = requested(&["main"]);
        gate(&cache).filter(&mut entries);
        assert!(store_of(&cache).dir().join(entrygate_store::BUILD_WINDOW_FILE).is_file());

        // Past the coarse filesystem clock, then edit while "compiling".
        std::thread::sleep(std::time::Duration::from_millis(50));
        std::fs::write(&main, "v2-edited").unwrap();

        let report = gate(&cache).commit(&[fileset("main", &[main])]).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.deferred, vec![EntryName::new("main")]);

        let mut entries = requested(&["main"]);
        gate(&cache).filter(&mut entries);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn commit_consumes_the_build_window() {
        let dir = tempfile::tempdir().unwrap();
        let main = source(dir.path(), "main.js", "v1");
        let cache = dir.path().join("cache");

        gate(&cache).filter(&mut requested(&["main"]));
        let report = gate(&cache).commit(&[fileset("main", &[main])]).unwrap();
        assert_eq!(report.written, vec![EntryName::new("main")]);
        assert_eq!(store_of(&cache).take_build_window().unwrap(), None);

        // Nothing left to build: no window is opened.
        let mut entries = requested(&["main"]);
        assert!(gate(&cache).filter(&mut entries).nothing_to_build());
        assert_eq!(store_of(&cache).take_build_window().unwrap(), None);
    }

    #[test]
    fn unreadable_build_window_defers_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let main = source(dir.path(), "main.js", "v1");
        let cache = dir.path().join("cache");
        let store = store_of(&cache);
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.dir().join(entrygate_store::BUILD_WINDOW_FILE), "garbage").unwrap();

        let report = gate(&cache).commit(&[fileset("main", &[main])]).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.deferred, vec![EntryName::new("main")]);
    }
}
