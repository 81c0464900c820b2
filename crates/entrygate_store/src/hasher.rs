//! Source file hashing and per-file change detection.
//!
//! A [`FileStamp`] records what a source file looked like when an entry was
//! committed. Checking a stamp takes the metadata fast path when size and
//! modification time are unchanged and falls back to rehashing the content
//! otherwise, so a touched-but-identical file still counts as unchanged.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use entrygate_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Size, modification time, and content hash of one source file.
///
/// A stamp without a content hash records a path that could not be read at
/// capture time (a virtual or generated module). It stays unchanged for as
/// long as the path stays unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    /// Path as reported by the host.
    pub path: PathBuf,
    /// File size in bytes, 0 for an absent file.
    pub size: u64,
    /// Last modification time, the Unix epoch for an absent file.
    pub modified: SystemTime,
    /// XXH3-128 of the file content, `None` if the file could not be read.
    pub content_hash: Option<ContentHash>,
}

impl FileStamp {
    /// Stamps the file at `path` as it is on disk right now.
    ///
    /// Fails with [`CacheError::Unstable`] if the file was modified while it
    /// was being hashed.
    pub fn capture(path: &Path) -> Result<Self, CacheError> {
        Self::capture_with(path, SourceHasher::hash_file)
    }

    fn capture_with(
        path: &Path,
        hash: impl FnOnce(&Path) -> Result<ContentHash, CacheError>,
    ) -> Result<Self, CacheError> {
        let (size, modified) = metadata_of(path)?;
        let content_hash = hash(path)?;
        if metadata_of(path)? != (size, modified) {
            return Err(CacheError::Unstable {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            size,
            modified,
            content_hash: Some(content_hash),
        })
    }

    /// A stamp for a path that could not be read.
    pub fn absent(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            content_hash: None,
        }
    }

    /// Whether the file was readable when the stamp was taken.
    pub fn is_present(&self) -> bool {
        self.content_hash.is_some()
    }

    /// Returns the content hash of the file as it is on disk now, or `None`
    /// if it is missing or unreadable.
    pub fn current_hash(&self) -> Option<ContentHash> {
        if let Some(stored) = self.content_hash {
            let (size, modified) = metadata_of(&self.path).ok()?;
            if size == self.size && modified == self.modified {
                return Some(stored);
            }
        }
        SourceHasher::hash_file(&self.path).ok()
    }

    /// Returns `true` if the file on disk no longer matches this stamp.
    ///
    /// A present file that disappeared and an absent file that appeared are
    /// both changes.
    pub fn was_changed(&self) -> bool {
        self.current_hash() != self.content_hash
    }
}

fn metadata_of(path: &Path) -> Result<(u64, SystemTime), CacheError> {
    let io_err = |e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let metadata = std::fs::metadata(path).map_err(io_err)?;
    let modified = metadata.modified().map_err(io_err)?;
    Ok((metadata.len(), modified))
}

/// Utility for computing content hashes of source files.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the content hash of a single file.
    ///
    /// Reads the file and returns its XXH3-128 content hash.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let content = std::fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(ContentHash::from_bytes(&content))
    }
}
