//! Persistent per-entry fingerprints for incremental bundling.
//!
//! A [`Fingerprint`] stamps every source file of an entry with its size,
//! modification time, and XXH3-128 content hash. The [`FingerprintStore`]
//! persists one record per entry and answers which entries are unchanged by
//! recomputing each stored fingerprint against the files on disk.

#![warn(missing_docs)]

pub mod error;
pub mod fingerprint;
pub mod hasher;
pub mod record;
pub mod store;

pub use error::CacheError;
pub use fingerprint::Fingerprint;
pub use hasher::{FileStamp, SourceHasher};
pub use record::CacheRecord;
pub use store::{FingerprintStore, FsFingerprintStore, BUILD_WINDOW_FILE};
