//! State reconciler — merges one round of probe results with prior state.
//!
//! The registry snapshot is authoritative for existence: targets absent
//! from it are pruned, targets present in it always get exactly one
//! entry. Probe outcomes only decide health, debounced by a
//! consecutive-failure threshold.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use watchman_fleet::{
    DeploymentTarget, HealthState, ProbeOutcome, ProbeResult, Round, StatusEntry, StatusStore,
    TargetName,
};

/// Applies completed rounds to the status store.
pub struct StateReconciler {
    store: StatusStore,
    failure_threshold: u32,
}

impl StateReconciler {
    pub fn new(store: StatusStore, failure_threshold: u32) -> Self {
        Self {
            store,
            failure_threshold,
        }
    }

    /// Consume one round's full result batch and swap in the next table.
    ///
    /// Returns `false` if the round was stale (an equal-or-newer round
    /// has already been applied) and the table was left untouched.
    pub fn apply(
        &self,
        round: &Round,
        targets: &Arc<HashMap<TargetName, DeploymentTarget>>,
    ) -> bool {
        let prior = self.store.table();
        let by_target: HashMap<&str, &ProbeResult> = round
            .results
            .iter()
            .map(|result| (result.target.as_str(), result))
            .collect();

        let mut next = HashMap::with_capacity(targets.len());
        for (name, target) in targets.iter() {
            let result = by_target.get(name.as_str()).copied();
            if result.is_none() {
                // The poller probes every snapshotted target, so a hole
                // in the batch means the probe never got scheduled.
                debug!(%name, round = round.seq, "target missing from round, treating as unreachable");
            }
            let entry = self.next_entry(target, prior.get(name), result, round.started_at);
            next.insert(name.clone(), entry);
        }

        let pruned = prior.keys().filter(|name| !targets.contains_key(*name));
        for name in pruned {
            info!(%name, round = round.seq, "pruning status for deregistered target");
        }

        self.store.replace(round.seq, next)
    }

    /// Classify the next entry for one target from its probe outcome and
    /// prior entry.
    fn next_entry(
        &self,
        target: &DeploymentTarget,
        prior: Option<&StatusEntry>,
        result: Option<&ProbeResult>,
        round_started_at: u64,
    ) -> StatusEntry {
        let mut entry = match prior {
            Some(prior) => {
                let mut entry = prior.clone();
                // Re-registration may have moved the target; the entry
                // always reflects the current desired state.
                entry.endpoint = target.endpoint.clone();
                entry.metadata = target.metadata.clone();
                entry
            }
            None => StatusEntry::unknown(target, round_started_at),
        };

        let synthesized = ProbeOutcome::Unreachable;
        let (outcome, observed_at) = match result {
            Some(result) => (&result.outcome, result.at),
            None => (&synthesized, round_started_at),
        };

        match outcome {
            ProbeOutcome::Healthy => {
                entry.consecutive_failures = 0;
                entry.last_success = Some(observed_at);
                if entry.health != HealthState::Healthy {
                    info!(name = %entry.name, "target healthy");
                    entry.health = HealthState::Healthy;
                    entry.last_transition = observed_at;
                }
            }
            failure => {
                entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
                if let ProbeOutcome::Unhealthy { reason } = failure {
                    debug!(name = %entry.name, %reason, "probe reported unhealthy");
                }
                if entry.consecutive_failures >= self.failure_threshold
                    && entry.health != HealthState::Unhealthy
                {
                    warn!(
                        name = %entry.name,
                        failures = entry.consecutive_failures,
                        threshold = self.failure_threshold,
                        "target transitioned to unhealthy"
                    );
                    entry.health = HealthState::Unhealthy;
                    entry.last_transition = observed_at;
                }
            }
        }

        entry
    }
}
