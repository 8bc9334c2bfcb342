//! REST API handlers.
//!
//! Queries read the status store; commands mutate the target registry.
//! Registration is desired-state: re-registering an existing name with
//! different metadata is a last-write-wins replace, never a conflict.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use watchman_fleet::{DeploymentTarget, StatusEntry, epoch_secs};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Status queries ─────────────────────────────────────────────

/// Body of `GET /status`.
#[derive(serde::Serialize)]
pub struct StatusListing {
    /// Round number that produced this table (0 before the first round).
    pub round: u64,
    pub entries: Vec<StatusEntry>,
}

/// GET /status
pub async fn list_status(State(state): State<ApiState>) -> impl IntoResponse {
    let listing = StatusListing {
        round: state.store.applied_round(),
        entries: state.store.list(),
    };
    ApiResponse::ok(listing)
}

/// GET /status/{name}
pub async fn get_status(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    // The registry is authoritative for existence: a deregistered target
    // is gone immediately, even if its entry lingers until the next round.
    let Some(target) = state.registry.get(&name) else {
        return error_response("target not registered", StatusCode::NOT_FOUND).into_response();
    };

    match state.store.get(&name) {
        Some(entry) => ApiResponse::ok(entry).into_response(),
        // Registered but not probed yet; converges within one interval.
        None => ApiResponse::ok(StatusEntry::unknown(&target, epoch_secs())).into_response(),
    }
}

// ── Target commands ────────────────────────────────────────────

/// POST /targets
pub async fn register_target(
    State(state): State<ApiState>,
    Json(target): Json<DeploymentTarget>,
) -> impl IntoResponse {
    if target.name.is_empty() {
        return error_response("target name must not be empty", StatusCode::BAD_REQUEST)
            .into_response();
    }
    if target.endpoint.is_empty() {
        return error_response("target endpoint must not be empty", StatusCode::BAD_REQUEST)
            .into_response();
    }

    state.registry.register(target.clone());
    (StatusCode::CREATED, ApiResponse::ok(target)).into_response()
}

/// DELETE /targets/{name}
pub async fn deregister_target(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let existed = state.registry.deregister(&name);
    debug!(%name, existed, "deregister handled");
    // Idempotent: deleting an absent target is not an error.
    ApiResponse::ok("deregistered")
}

// ── Liveness ───────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use watchman_fleet::{HealthState, ModelMetadata, StatusStore, TargetRegistry};

    fn test_state() -> ApiState {
        ApiState {
            registry: TargetRegistry::new(),
            store: StatusStore::new(),
        }
    }

    fn test_target(name: &str) -> DeploymentTarget {
        DeploymentTarget {
            name: name.to_string(),
            endpoint: "10.0.0.1:5555".to_string(),
            metadata: ModelMetadata {
                project: "windfarm".to_string(),
                model_version: "1".to_string(),
            },
        }
    }

    fn healthy_entry(name: &str) -> StatusEntry {
        StatusEntry {
            name: name.to_string(),
            endpoint: "10.0.0.1:5555".to_string(),
            metadata: ModelMetadata {
                project: "windfarm".to_string(),
                model_version: "1".to_string(),
            },
            health: HealthState::Healthy,
            consecutive_failures: 0,
            last_success: Some(1000),
            last_transition: 1000,
        }
    }

    #[tokio::test]
    async fn list_status_empty() {
        let state = test_state();
        let resp = list_status(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_status_unregistered_is_not_found() {
        let state = test_state();
        let resp = get_status(State(state), Path("nope".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_status_registered_but_unprobed_reports_unknown() {
        let state = test_state();
        state.registry.register(test_target("a"));

        let resp = get_status(State(state), Path("a".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_status_returns_reconciled_entry() {
        let state = test_state();
        state.registry.register(test_target("a"));
        state.store.replace(
            1,
            HashMap::from([("a".to_string(), healthy_entry("a"))]),
        );

        let resp = get_status(State(state), Path("a".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_status_after_deregister_is_not_found_immediately() {
        let state = test_state();
        state.registry.register(test_target("a"));
        state.store.replace(
            1,
            HashMap::from([("a".to_string(), healthy_entry("a"))]),
        );

        // Deregistered but not yet pruned from the status table.
        state.registry.deregister("a");
        let resp = get_status(State(state), Path("a".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_returns_created_and_accepted_target() {
        let state = test_state();
        let resp = register_target(State(state.clone()), Json(test_target("a")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(state.registry.contains("a"));
    }

    #[tokio::test]
    async fn register_is_last_write_wins() {
        let state = test_state();
        register_target(State(state.clone()), Json(test_target("a")))
            .await
            .into_response();

        let mut replacement = test_target("a");
        replacement.endpoint = "10.0.0.2:5555".to_string();
        let resp = register_target(State(state.clone()), Json(replacement))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(state.registry.get("a").unwrap().endpoint, "10.0.0.2:5555");
        assert_eq!(state.registry.len(), 1);
    }

    #[tokio::test]
    async fn register_rejects_empty_name() {
        let state = test_state();
        let resp = register_target(State(state), Json(test_target("")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_empty_endpoint() {
        let state = test_state();
        let mut target = test_target("a");
        target.endpoint = String::new();
        let resp = register_target(State(state), Json(target))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deregister_is_idempotent() {
        let state = test_state();
        state.registry.register(test_target("a"));

        let resp = deregister_target(State(state.clone()), Path("a".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        // Second delete of the same name is still OK.
        let resp = deregister_target(State(state), Path("a".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
