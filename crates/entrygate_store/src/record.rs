//! On-disk cache records.
//!
//! Each entry is stored as `<cache key>.json` in the store directory, where
//! the cache key is the hex digest of the entry name. Records are written to a
//! temporary file in the same directory and renamed into place, so readers
//! observe either the previous record or the new one, never a torn write.

use std::io::Write;
use std::path::{Path, PathBuf};

use entrygate_common::EntryName;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::fingerprint::Fingerprint;

/// File extension of record files.
pub const RECORD_EXT: &str = "json";

/// Current record format version. Records of any other version are ignored.
const RECORD_FORMAT_VERSION: u32 = 2;

/// The persisted fingerprint of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// The entry this record belongs to.
    pub name: EntryName,
    /// Fingerprint of the entry's files at its last successful build.
    pub fingerprint: Fingerprint,
}

/// Serialized form of a record file.
#[derive(Serialize, Deserialize)]
struct RecordFile {
    format_version: u32,
    name: EntryName,
    fingerprint: Fingerprint,
}

impl CacheRecord {
    /// Creates a record.
    pub fn new(name: EntryName, fingerprint: Fingerprint) -> Self {
        Self { name, fingerprint }
    }

    /// Path of the record file for `name` inside `dir`.
    pub fn path_for(dir: &Path, name: &EntryName) -> PathBuf {
        dir.join(format!("{}.{RECORD_EXT}", name.cache_key()))
    }

    /// Loads a record file.
    ///
    /// Returns `Ok(None)` for records written by another format version and for
    /// files whose name does not match the entry they claim to hold.
    pub fn load(path: &Path) -> Result<Option<Self>, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: RecordFile =
            serde_json::from_str(&content).map_err(|e| CacheError::RecordParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if file.format_version != RECORD_FORMAT_VERSION {
            tracing::debug!(
                path = %path.display(),
                found = file.format_version,
                expected = RECORD_FORMAT_VERSION,
                "ignoring record of another format version"
            );
            return Ok(None);
        }
        let expected_stem = file.name.cache_key();
        if path.file_stem().and_then(|s| s.to_str()) != Some(expected_stem.as_str()) {
            tracing::warn!(
                path = %path.display(),
                entry = %file.name,
                "ignoring record stored under the wrong file name"
            );
            return Ok(None);
        }

        Ok(Some(Self {
            name: file.name,
            fingerprint: file.fingerprint,
        }))
    }

    /// Atomically writes this record into `dir` and returns its path.
    ///
    /// `dir` must already exist.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, CacheError> {
        let path = Self::path_for(dir, &self.name);
        let file = RecordFile {
            format_version: RECORD_FORMAT_VERSION,
            name: self.name.clone(),
            fingerprint: self.fingerprint.clone(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

        write_atomic(dir, &path, &json)?;
        Ok(path)
    }
}

/// Writes `bytes` to `path` through a temp file in `dir` and a rename.
pub(crate) fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let io_err = |e: std::io::Error| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CacheError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
