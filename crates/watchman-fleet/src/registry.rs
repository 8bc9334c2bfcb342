//! TargetRegistry — the desired set of model deployment targets.
//!
//! The registry is the source of truth for "what should exist". The API
//! registers and deregisters targets; the poller takes an immutable
//! snapshot at the start of each round so mutation mid-round never
//! affects that round.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::types::{DeploymentTarget, TargetName};

/// Thread-safe registry of deployment targets.
///
/// Copy-on-write: the map lives behind an `Arc` that is rebuilt and
/// swapped on every mutation, so `snapshot()` is an `Arc` clone and
/// readers never hold the lock across their own work.
#[derive(Clone, Default)]
pub struct TargetRegistry {
    inner: Arc<RwLock<Arc<HashMap<TargetName, DeploymentTarget>>>>,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a target by name. Idempotent; re-registering an
    /// existing name with different metadata is a last-write-wins
    /// replace, never a conflict.
    pub fn register(&self, target: DeploymentTarget) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = HashMap::clone(&guard);
        let replaced = next.insert(target.name.clone(), target.clone()).is_some();
        *guard = Arc::new(next);
        info!(name = %target.name, endpoint = %target.endpoint, replaced, "target registered");
    }

    /// Remove a target by name. Idempotent; returns whether it existed.
    pub fn deregister(&self, name: &str) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !guard.contains_key(name) {
            debug!(%name, "deregister of absent target ignored");
            return false;
        }
        let mut next = HashMap::clone(&guard);
        next.remove(name);
        *guard = Arc::new(next);
        info!(%name, "target deregistered");
        true
    }

    /// Immutable point-in-time view of the current target set.
    pub fn snapshot(&self) -> Arc<HashMap<TargetName, DeploymentTarget>> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Look up a single target.
    pub fn get(&self, name: &str) -> Option<DeploymentTarget> {
        self.snapshot().get(name).cloned()
    }

    /// Whether a target is currently registered.
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelMetadata;

    fn target(name: &str, endpoint: &str) -> DeploymentTarget {
        DeploymentTarget {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            metadata: ModelMetadata {
                project: "windfarm".to_string(),
                model_version: "1".to_string(),
            },
        }
    }

    #[test]
    fn register_and_get() {
        let registry = TargetRegistry::new();
        registry.register(target("a", "10.0.0.1:5555"));

        assert!(registry.contains("a"));
        assert_eq!(registry.get("a").unwrap().endpoint, "10.0.0.1:5555");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_replaces_existing_name() {
        let registry = TargetRegistry::new();
        registry.register(target("a", "10.0.0.1:5555"));
        registry.register(target("a", "10.0.0.2:5555"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().endpoint, "10.0.0.2:5555");
    }

    #[test]
    fn deregister_is_idempotent() {
        let registry = TargetRegistry::new();
        registry.register(target("a", "10.0.0.1:5555"));

        assert!(registry.deregister("a"));
        assert!(!registry.deregister("a"));
        assert!(!registry.deregister("never-existed"));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_mutation() {
        let registry = TargetRegistry::new();
        registry.register(target("a", "10.0.0.1:5555"));

        let snapshot = registry.snapshot();
        registry.register(target("b", "10.0.0.2:5555"));
        registry.deregister("a");

        // The snapshot still reflects the moment it was taken.
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("a"));
        // The live view reflects the mutations.
        assert!(!registry.contains("a"));
        assert!(registry.contains("b"));
    }

    #[test]
    fn concurrent_register_and_snapshot() {
        let registry = TargetRegistry::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let reg = registry.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    reg.register(target(&format!("t-{i}-{j}"), "10.0.0.1:5555"));
                    let snap = reg.snapshot();
                    assert!(snap.contains_key(&format!("t-{i}-{j}")));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8 * 50);
    }
}
