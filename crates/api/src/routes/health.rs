//! Liveness probe for the Tally server.

use axum::{Json, Router, routing::get};
use serde::Serialize;
use tally_core::ledger::LedgerStore;

use crate::AppState;

/// Body of `GET /health`.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: &'static str,
    /// Crate version of `tally-api`.
    pub version: &'static str,
}

/// Reports liveness without touching the ledger store.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Mounts `/health` at the router root, outside `/api`.
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health_check))
}
