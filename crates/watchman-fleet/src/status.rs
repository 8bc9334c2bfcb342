//! StatusStore — the authoritative per-target status table.
//!
//! Single writer (the reconciler), many concurrent readers (the API).
//! Updates are whole-table replacements tagged with a round number, so a
//! reader always sees the output of exactly one reconciliation round.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::types::{StatusEntry, TargetName};

struct Inner {
    /// Round number of the last applied table. Round 0 means "cold
    /// start, nothing applied yet".
    applied_round: u64,
    entries: Arc<HashMap<TargetName, StatusEntry>>,
}

/// Atomically swappable status table.
#[derive(Clone)]
pub struct StatusStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    /// Create an empty store. The table converges to accuracy within
    /// one poll interval after startup.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                applied_round: 0,
                entries: Arc::new(HashMap::new()),
            })),
        }
    }

    /// Atomically swap in the table produced by the given round.
    ///
    /// Returns `false` and leaves the table untouched if `round` is not
    /// newer than the last applied round. This is how a delayed older
    /// round becomes a no-op instead of clobbering fresher state.
    pub fn replace(&self, round: u64, entries: HashMap<TargetName, StatusEntry>) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if round <= guard.applied_round {
            warn!(
                round,
                applied = guard.applied_round,
                "discarding stale round"
            );
            return false;
        }
        guard.applied_round = round;
        guard.entries = Arc::new(entries);
        debug!(round, entries = guard.entries.len(), "status table replaced");
        true
    }

    /// Single entry by target name, from a consistent view.
    pub fn get(&self, name: &str) -> Option<StatusEntry> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.entries.get(name).cloned()
    }

    /// All entries from one consistent view, sorted by name.
    pub fn list(&self) -> Vec<StatusEntry> {
        let snapshot = {
            let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
            Arc::clone(&guard.entries)
        };
        let mut entries: Vec<StatusEntry> = snapshot.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Point-in-time view of the whole table, for the reconciler.
    pub fn table(&self) -> Arc<HashMap<TargetName, StatusEntry>> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard.entries)
    }

    /// Round number of the last applied table (0 before the first round).
    pub fn applied_round(&self) -> u64 {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.applied_round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HealthState;

    fn entry(name: &str, health: HealthState, failures: u32) -> StatusEntry {
        StatusEntry {
            name: name.to_string(),
            endpoint: "10.0.0.1:5555".to_string(),
            metadata: crate::types::ModelMetadata {
                project: "windfarm".to_string(),
                model_version: "1".to_string(),
            },
            health,
            consecutive_failures: failures,
            last_success: None,
            last_transition: 1000,
        }
    }

    fn table(entries: &[StatusEntry]) -> HashMap<TargetName, StatusEntry> {
        entries
            .iter()
            .map(|e| (e.name.clone(), e.clone()))
            .collect()
    }

    #[test]
    fn starts_empty_at_round_zero() {
        let store = StatusStore::new();
        assert_eq!(store.applied_round(), 0);
        assert!(store.list().is_empty());
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn replace_and_read() {
        let store = StatusStore::new();
        assert!(store.replace(1, table(&[entry("a", HealthState::Healthy, 0)])));

        assert_eq!(store.applied_round(), 1);
        assert_eq!(store.get("a").unwrap().health, HealthState::Healthy);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn stale_round_is_discarded() {
        let store = StatusStore::new();
        assert!(store.replace(2, table(&[entry("a", HealthState::Healthy, 0)])));

        // Round 1 arrives late; it must not clobber round 2.
        assert!(!store.replace(1, table(&[entry("a", HealthState::Unhealthy, 5)])));
        assert!(!store.replace(2, table(&[])));

        assert_eq!(store.applied_round(), 2);
        assert_eq!(store.get("a").unwrap().health, HealthState::Healthy);
    }

    #[test]
    fn replace_drops_entries_absent_from_new_table() {
        let store = StatusStore::new();
        store.replace(
            1,
            table(&[
                entry("a", HealthState::Healthy, 0),
                entry("b", HealthState::Unhealthy, 3),
            ]),
        );
        store.replace(2, table(&[entry("a", HealthState::Healthy, 0)]));

        assert!(store.get("b").is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn list_is_sorted_by_name() {
        let store = StatusStore::new();
        store.replace(
            1,
            table(&[
                entry("zeta", HealthState::Healthy, 0),
                entry("alpha", HealthState::Healthy, 0),
                entry("mid", HealthState::Healthy, 0),
            ]),
        );

        let names: Vec<String> = store.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn readers_never_see_a_mixed_table() {
        // Every entry in a table carries the round that produced it (in
        // consecutive_failures, abused as a marker); a reader must only
        // ever see one marker value across the whole list.
        let store = StatusStore::new();
        store.replace(1, table(&[entry("a", HealthState::Healthy, 1), entry("b", HealthState::Healthy, 1)]));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for round in 2..200u32 {
                    store.replace(
                        round as u64,
                        table(&[
                            entry("a", HealthState::Healthy, round),
                            entry("b", HealthState::Healthy, round),
                        ]),
                    );
                }
            })
        };

        for _ in 0..500 {
            let entries = store.list();
            assert_eq!(entries.len(), 2);
            assert_eq!(
                entries[0].consecutive_failures, entries[1].consecutive_failures,
                "list mixed entries from two rounds"
            );
        }
        writer.join().unwrap();
    }
}
