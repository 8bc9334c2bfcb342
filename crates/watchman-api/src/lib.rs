//! watchman-api — REST surface over the fleet tables.
//!
//! Read-only queries against the status store plus a command surface
//! into the target registry. The API never blocks on probing; reads are
//! served from the most recently reconciled table.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/status` | All status entries plus the applied round |
//! | GET | `/status/{name}` | Status of one registered target |
//! | POST | `/targets` | Register or replace a target |
//! | DELETE | `/targets/{name}` | Deregister a target (idempotent) |
//! | GET | `/healthz` | Liveness of Watchman itself |

pub mod handlers;

use axum::Router;
use axum::routing::{delete, get, post};

use watchman_fleet::{StatusStore, TargetRegistry};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: TargetRegistry,
    pub store: StatusStore,
}

/// Build the complete API router.
pub fn build_router(registry: TargetRegistry, store: StatusStore) -> Router {
    let state = ApiState { registry, store };

    Router::new()
        .route("/status", get(handlers::list_status))
        .route("/status/{name}", get(handlers::get_status))
        .route("/targets", post(handlers::register_target))
        .route("/targets/{name}", delete(handlers::deregister_target))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
