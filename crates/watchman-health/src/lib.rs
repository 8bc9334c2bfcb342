//! watchman-health — the poll-and-reconcile engine of Watchman.
//!
//! Probes every registered model deployment on a fixed interval, merges
//! the outcomes into the authoritative status table, and keeps doing so
//! under partial and intermittent failure.
//!
//! # Architecture
//!
//! ```text
//! ProbePoller (one tick per round)
//!   ├── TargetRegistry::snapshot() — the round's fixed target set
//!   ├── probe() per target — bounded by a semaphore, each with its
//!   │   own timeout → ProbeResult
//!   ├── round deadline — stragglers detached, synthesized as Timeout
//!   └── StateReconciler::apply(round)
//!         ├── debounce: N consecutive failures before Unhealthy
//!         ├── prune: deregistered targets drop out of the table
//!         └── StatusStore::replace(round, table) — atomic, in round order
//! ```
//!
//! No probe failure ever aborts a round for other targets; every failure
//! mode is a [`watchman_fleet::ProbeOutcome`] variant.

pub mod config;
pub mod error;
pub mod poller;
pub mod probe;
pub mod reconciler;

pub use config::WatchConfig;
pub use error::{ConfigError, ConfigResult};
pub use poller::ProbePoller;
pub use probe::probe;
pub use reconciler::StateReconciler;
