//! Cache gate and build hooks for incremental bundling.
//!
//! The [`CacheGate`] runs once before a build, dropping requested entries
//! whose files are unchanged since their last successful build, and once
//! after it, persisting fresh fingerprints for the entries that were built.
//! [`CacheHooks`] binds the gate to the host's before-build and after-build
//! hook points.

#![warn(missing_docs)]

pub mod error;
pub mod gate;
pub mod hooks;

pub use error::GateError;
pub use gate::{CacheGate, CommitReport, FilterReport, GateState};
pub use hooks::{BuildDecision, CacheHooks};
