//! Build entry names.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// The name of one build entry point, stable across builds.
///
/// Used as the key of the requested-entry map and of persisted cache records.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryName(String);

impl EntryName {
    /// Creates an entry name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a file-system safe key derived from the name.
    ///
    /// Entry names may contain path separators (`pages/index`), so records are
    /// stored under the hex digest of the name instead.
    pub fn cache_key(&self) -> String {
        ContentHash::from_bytes(self.0.as_bytes()).to_string()
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Borrow<str> for EntryName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for EntryName {
    fn from(name: String) -> Self {
        Self(name)
    }
}
