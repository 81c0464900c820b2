//! Entry fingerprints.
//!
//! A fingerprint aggregates the stamps of every file in an entry's fileset
//! into one digest. Comparing "stored" against "current" means recomputing the
//! digest from the stored file list against the files on disk right now.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use entrygate_common::{ContentHash, ContentHasher};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::hasher::FileStamp;

/// The content of an entry's files at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// XXH3-128 over the ordered `(path, content hash)` pairs of `files`.
    pub digest: ContentHash,
    /// Rendered hash of the entry's last processed chunk, kept for diagnostics.
    pub chunk_hash: Option<String>,
    /// One stamp per file, sorted by path, no duplicates. Files that could not
    /// be read carry an absent stamp.
    pub files: Vec<FileStamp>,
}

impl Fingerprint {
    /// Captures a fingerprint of `files` as they are on disk now.
    ///
    /// Duplicate paths are collapsed. Paths that cannot be read (virtual
    /// modules, generated files, files edited mid-read) get an absent stamp,
    /// so their later appearance counts as a change.
    pub fn capture(files: &[PathBuf], chunk_hash: Option<String>) -> Self {
        let unique: BTreeSet<&Path> = files.iter().map(PathBuf::as_path).collect();
        let files: Vec<FileStamp> = unique
            .into_par_iter()
            .map(|path| {
                FileStamp::capture(path).unwrap_or_else(|e| {
                    tracing::debug!(path = %path.display(), error = %e, "stamping unreadable file as absent");
                    FileStamp::absent(path)
                })
            })
            .collect();
        let digest = digest_of(files.iter().map(|stamp| (&stamp.path, stamp.content_hash)));
        Self {
            digest,
            chunk_hash,
            files,
        }
    }

    /// Recomputes the digest from the stored file list against the disk.
    ///
    /// A file that went missing, or an absent one that appeared, changes the
    /// result.
    pub fn recompute(&self) -> ContentHash {
        let hashes: Vec<Option<ContentHash>> = self
            .files
            .par_iter()
            .map(FileStamp::current_hash)
            .collect();
        digest_of(
            self.files
                .iter()
                .map(|stamp| &stamp.path)
                .zip(hashes),
        )
    }

    /// Returns `true` if the files on disk still match this fingerprint.
    ///
    /// A fingerprint without a single readable file proves nothing and is
    /// never current.
    pub fn is_current(&self) -> bool {
        self.files.iter().any(FileStamp::is_present) && self.recompute() == self.digest
    }

    /// Returns `true` if any present file was modified at or after `instant`.
    pub fn modified_since(&self, instant: SystemTime) -> bool {
        self.files
            .iter()
            .any(|stamp| stamp.is_present() && stamp.modified >= instant)
    }
}

fn digest_of<'a>(
    pairs: impl Iterator<Item = (&'a PathBuf, Option<ContentHash>)>,
) -> ContentHash {
    let mut hasher = ContentHasher::new();
    for (path, hash) in pairs {
        hasher.update(path.to_string_lossy().as_bytes());
        match hash {
            Some(hash) => hasher.update(hash.as_bytes()),
            None => hasher.update(&[]),
        };
    }
    hasher.finish()
}
