//! The fingerprint store contract and its directory-backed implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use entrygate_common::EntryName;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::fingerprint::Fingerprint;
use crate::record::{write_atomic, CacheRecord, RECORD_EXT};

/// File in the store directory holding the start of the open build window.
pub const BUILD_WINDOW_FILE: &str = "build-window";

#[derive(Serialize, Deserialize)]
struct BuildWindow {
    started: SystemTime,
}

/// Persistent mapping from entry name to fingerprint.
pub trait FingerprintStore {
    /// Reads every stored fingerprint.
    ///
    /// A store that has never been written yields an empty map.
    fn lookup_all(&self) -> Result<BTreeMap<EntryName, Fingerprint>, CacheError>;

    /// Persists `records`, leaving records of other entries untouched.
    ///
    /// A record that fails to write keeps its previous version.
    fn upsert(&self, records: &[CacheRecord]) -> Result<(), CacheError>;

    /// Names of the stored entries whose files are unchanged on disk.
    fn unchanged_entries(&self) -> Result<BTreeSet<EntryName>, CacheError> {
        let stored = self.lookup_all()?;
        Ok(stored
            .into_par_iter()
            .filter(|(_, fingerprint)| fingerprint.is_current())
            .map(|(name, _)| name)
            .collect())
    }

    /// Records the instant a build window opened, so a commit running in
    /// another process can still tell which files were edited mid-build.
    ///
    /// Stores that cannot persist it rely on the in-process gate state.
    fn open_build_window(&self, _started: SystemTime) -> Result<(), CacheError> {
        Ok(())
    }

    /// Reads and removes the instant recorded by
    /// [`open_build_window`](Self::open_build_window). Returns `Ok(None)` when
    /// no window is open.
    fn take_build_window(&self) -> Result<Option<SystemTime>, CacheError> {
        Ok(None)
    }
}

/// A fingerprint store keeping one JSON record file per entry in a directory.
///
/// Each record is replaced atomically, so concurrent writers cannot corrupt
/// a record; the last writer wins. There is no cross-process locking.
#[derive(Debug, Clone)]
pub struct FsFingerprintStore {
    dir: PathBuf,
}

impl FsFingerprintStore {
    /// Creates a store rooted at `dir`. Nothing is touched on disk until the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads every valid record in the store.
    ///
    /// Unparseable records are skipped with a warning so that one corrupt
    /// file only costs a rebuild of its entry.
    pub fn records(&self) -> Result<Vec<CacheRecord>, CacheError> {
        let mut records = Vec::new();
        for path in self.record_paths()? {
            match CacheRecord::load(&path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable cache record"),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    /// Deletes the record of `name`. Returns `true` if one existed.
    pub fn remove(&self, name: &EntryName) -> Result<bool, CacheError> {
        let path = CacheRecord::path_for(&self.dir, name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io { path, source: e }),
        }
    }

    /// Deletes every record file and any open build window. Returns the
    /// number of records removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let _ = self.take_build_window();
        let mut removed = 0;
        for path in self.record_paths()? {
            std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                path: path.clone(),
                source: e,
            })?;
            removed += 1;
        }
        Ok(removed)
    }

    fn window_path(&self) -> PathBuf {
        self.dir.join(BUILD_WINDOW_FILE)
    }

    fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::Io {
            path: self.dir.clone(),
            source: e,
        })
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let io_err = |e: std::io::Error| CacheError::Io {
            path: self.dir.clone(),
            source: e,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl FingerprintStore for FsFingerprintStore {
    fn lookup_all(&self) -> Result<BTreeMap<EntryName, Fingerprint>, CacheError> {
        let records = self.records()?;
        tracing::debug!(dir = %self.dir.display(), records = records.len(), "loaded cache records");
        Ok(records
            .into_iter()
            .map(|record| (record.name, record.fingerprint))
            .collect())
    }

    fn upsert(&self, records: &[CacheRecord]) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let mut failed = Vec::new();
        let mut first_error = None;
        for record in records {
            match record.save(&self.dir) {
                Ok(path) => {
                    tracing::debug!(entry = %record.name, path = %path.display(), "wrote cache record");
                }
                Err(e) => {
                    tracing::warn!(entry = %record.name, error = %e, "failed to write cache record");
                    failed.push(record.name.clone());
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(source) => Err(CacheError::Upsert {
                failed,
                source: Box::new(source),
            }),
        }
    }

    fn open_build_window(&self, started: SystemTime) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let json = serde_json::to_vec(&BuildWindow { started }).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })?;
        write_atomic(&self.dir, &self.window_path(), &json)
    }

    fn take_build_window(&self) -> Result<Option<SystemTime>, CacheError> {
        let path = self.window_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::Io { path, source: e }),
        }
        let window: BuildWindow =
            serde_json::from_str(&content).map_err(|e| CacheError::RecordParse {
                path,
                reason: e.to_string(),
            })?;
        Ok(Some(window.started))
    }
}
