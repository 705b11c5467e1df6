//! HTTP API layer with Axum routes over the wallet ledger.
//!
//! This crate provides:
//! - Health check route
//! - Account setup, posting and balance routes under `/api`
//! - Mapping of ledger errors onto JSON error responses

pub mod routes;

use axum::Router;
use tally_core::ledger::{LedgerService, LedgerStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState<S> {
    /// Ledger operations over the configured store.
    pub ledger: LedgerService<S>,
}

impl<S: LedgerStore> AppState<S> {
    /// Creates state around a ledger service.
    #[must_use]
    pub const fn new(ledger: LedgerService<S>) -> Self {
        Self { ledger }
    }
}

/// Creates the main application router.
pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .merge(routes::health::routes::<S>())
        .nest("/api", routes::api_routes::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
