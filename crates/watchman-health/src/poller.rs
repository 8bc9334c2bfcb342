//! Probe poller — fans probes out across the fleet once per tick.
//!
//! Each tick snapshots the registry, probes every target concurrently
//! (bounded by a semaphore), closes the round at a hard deadline, and
//! hands the complete batch to the reconciler exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use watchman_fleet::{
    DeploymentTarget, ProbeOutcome, ProbeResult, Round, TargetName, TargetRegistry, epoch_secs,
};

use crate::config::WatchConfig;
use crate::probe::probe;
use crate::reconciler::StateReconciler;

/// Owner of the poll-and-reconcile control loop.
pub struct ProbePoller {
    registry: TargetRegistry,
    reconciler: StateReconciler,
    config: WatchConfig,
}

impl ProbePoller {
    pub fn new(registry: TargetRegistry, reconciler: StateReconciler, config: WatchConfig) -> Self {
        Self {
            registry,
            reconciler,
            config,
        }
    }

    /// Run rounds until the shutdown signal flips.
    ///
    /// The first round starts immediately so a cold-started status table
    /// converges within one poll interval.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq: u64 = 0;

        info!(
            interval = ?self.config.poll_interval,
            probe_timeout = ?self.config.probe_timeout,
            max_in_flight = self.config.max_in_flight,
            "probe poller starting"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    seq += 1;
                    self.run_once(seq).await;
                }
                _ = shutdown.changed() => {
                    info!("probe poller shutting down");
                    break;
                }
            }
        }
    }

    /// Execute and reconcile a single round. Returns whether the round
    /// was applied (a stale round is discarded by the store).
    pub async fn run_once(&self, seq: u64) -> bool {
        let targets = self.registry.snapshot();
        let round = self.poll_round(seq, &targets).await;
        let applied = self.reconciler.apply(&round, &targets);
        debug!(round = seq, targets = targets.len(), applied, "round reconciled");
        applied
    }

    /// Execute one round: probe every target in the snapshot, collect
    /// all results, and close the round at the deadline.
    pub async fn poll_round(
        &self,
        seq: u64,
        targets: &Arc<HashMap<TargetName, DeploymentTarget>>,
    ) -> Round {
        let started_at = epoch_secs();
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks: JoinSet<ProbeResult> = JoinSet::new();

        for target in targets.values() {
            let target = target.clone();
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.config.probe_timeout;
            let path = self.config.health_path.clone();
            tasks.spawn(async move {
                // Backpressure: wait for a free probe slot instead of
                // fanning out unboundedly.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // The semaphore is never closed while a round runs.
                        return ProbeResult {
                            target: target.name.clone(),
                            at: epoch_secs(),
                            outcome: ProbeOutcome::Timeout,
                            reported: None,
                        };
                    }
                };
                probe(&target, &path, timeout).await
            });
        }

        let mut results = Vec::with_capacity(targets.len());
        let deadline = tokio::time::sleep(self.config.poll_interval);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(result)) => results.push(result),
                    Some(Err(e)) => warn!(round = seq, error = %e, "probe task failed"),
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        round = seq,
                        stragglers = tasks.len(),
                        "round deadline elapsed, abandoning stragglers"
                    );
                    // Stragglers keep running until their own probe
                    // timeout fires, but the round is closed and any
                    // late result is discarded.
                    tasks.detach_all();
                    break;
                }
            }
        }

        // Every snapshotted target gets exactly one result per round;
        // abandoned probes are recorded as timeouts.
        let mut synthesized = Vec::new();
        {
            let seen: HashSet<&str> = results.iter().map(|r| r.target.as_str()).collect();
            for name in targets.keys() {
                if !seen.contains(name.as_str()) {
                    synthesized.push(ProbeResult {
                        target: name.clone(),
                        at: epoch_secs(),
                        outcome: ProbeOutcome::Timeout,
                        reported: None,
                    });
                }
            }
        }
        results.extend(synthesized);

        Round {
            seq,
            started_at,
            results,
        }
    }
}
