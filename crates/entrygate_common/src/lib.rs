//! Shared foundational types used across the entrygate workspace.
//!
//! This crate provides the content hash used for fingerprints and record keys,
//! and the [`EntryName`] identifying one build entry point.

#![warn(missing_docs)]

pub mod entry;
pub mod hash;

pub use entry::EntryName;
pub use hash::{ContentHash, ContentHasher};
