//! API route definitions.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::ledger::{LedgerError, LedgerStore};
use tracing::error;

use crate::AppState;

pub mod health;
pub mod wallets;

/// Creates the router mounted under `/api`.
pub fn api_routes<S: LedgerStore>() -> axum::Router<AppState<S>> {
    axum::Router::new().merge(wallets::routes::<S>())
}

/// Renders a ledger error as `{error, message}` with its status code.
///
/// Server-side failures are logged and answered with a generic message.
pub fn error_response(err: &LedgerError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if status.is_server_error() {
        error!(error = %err, code = err.error_code(), "Request failed");
        if status == StatusCode::SERVICE_UNAVAILABLE {
            "The ledger is busy, retry the request".to_string()
        } else {
            "An error occurred".to_string()
        }
    } else {
        err.to_string()
    };

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": message
        })),
    )
        .into_response()
}
