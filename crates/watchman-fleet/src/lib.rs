//! watchman-fleet — shared fleet state for Watchman.
//!
//! Holds the two shared mutable tables of the control loop:
//!
//! - [`TargetRegistry`] — the desired set of model deployment targets
//!   ("what should exist"), written by the API, snapshotted by the poller.
//! - [`StatusStore`] — the authoritative per-target status table ("what
//!   actually exists and how healthy it is"), written by the reconciler,
//!   read by the API.
//!
//! # Architecture
//!
//! Both tables follow single-writer/many-reader discipline with atomic
//! snapshot/replace semantics: the map lives behind an `Arc` that is
//! swapped wholesale under a short lock, so readers get a consistent
//! point-in-time view and never observe a partially-updated table.

pub mod registry;
pub mod status;
pub mod types;

pub use registry::TargetRegistry;
pub use status::StatusStore;
pub use types::*;
