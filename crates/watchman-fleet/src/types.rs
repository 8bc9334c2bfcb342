//! Domain types for the Watchman fleet.
//!
//! These types flow through the whole control loop: targets come in via
//! registration, probe results are produced once per target per round,
//! and status entries are the reconciled output served by the API.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique name of a model deployment target.
pub type TargetName = String;

// ── Targets ───────────────────────────────────────────────────────

/// Metadata a deployed model server is expected to report.
///
/// Used to detect a "wrong model serving" condition: an endpoint that
/// answers but reports different metadata is unhealthy, not unreachable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelMetadata {
    /// Project the model belongs to.
    pub project: String,
    /// Version of the trained model artifact.
    #[serde(rename = "model-version")]
    pub model_version: String,
}

/// Desired-state record for one deployed model server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub name: TargetName,
    /// Network address of the serving instance (host:port).
    pub endpoint: String,
    /// Metadata the instance is expected to report when probed.
    pub metadata: ModelMetadata,
}

// ── Probes ────────────────────────────────────────────────────────

/// Outcome of a single health probe.
///
/// Every failure mode of a probe is one of these variants; probing never
/// surfaces an error past the call boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The endpoint answered and its reported state checks out.
    Healthy,
    /// The endpoint answered but is degraded or serving the wrong model.
    Unhealthy { reason: String },
    /// The endpoint could not be reached at all.
    Unreachable,
    /// The probe did not complete within its timeout.
    Timeout,
}

impl ProbeOutcome {
    /// Whether this outcome counts against the failure threshold.
    pub fn is_failure(&self) -> bool {
        !matches!(self, ProbeOutcome::Healthy)
    }
}

/// Result of one health check against one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeResult {
    pub target: TargetName,
    /// Unix timestamp (seconds) when the probe completed.
    pub at: u64,
    pub outcome: ProbeOutcome,
    /// Metadata the instance reported, when the probe got that far.
    pub reported: Option<ModelMetadata>,
}

/// One complete poll-and-reconcile cycle across all current targets.
#[derive(Debug, Clone)]
pub struct Round {
    /// Monotonic sequence number; the status store only accepts rounds
    /// in increasing order.
    pub seq: u64,
    /// Unix timestamp (seconds) when the round started.
    pub started_at: u64,
    pub results: Vec<ProbeResult>,
}

// ── Status ────────────────────────────────────────────────────────

/// Health classification of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    /// Not enough evidence yet (freshly registered, below threshold).
    Unknown,
}

/// Authoritative per-target state held in the status store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEntry {
    pub name: TargetName,
    /// Endpoint of the serving instance, so API clients can discover
    /// where to send prediction requests.
    pub endpoint: String,
    pub metadata: ModelMetadata,
    pub health: HealthState,
    pub consecutive_failures: u32,
    /// Unix timestamp of the last successful probe, if any.
    pub last_success: Option<u64>,
    /// Unix timestamp of the last health transition.
    pub last_transition: u64,
}

impl StatusEntry {
    /// Fresh entry for a target that has not been probed yet.
    pub fn unknown(target: &DeploymentTarget, now: u64) -> Self {
        Self {
            name: target.name.clone(),
            endpoint: target.endpoint.clone(),
            metadata: target.metadata.clone(),
            health: HealthState::Unknown,
            consecutive_failures: 0,
            last_success: None,
            last_transition: now,
        }
    }
}

/// Current unix timestamp in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
