//! Wallet routes: account setup, postings and balance reads.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tally_core::ledger::{
    DEFAULT_ASSET_TYPE, IdempotencyKey, LedgerError, LedgerStore, TransactionRequest,
    TransactionType,
};
use tally_shared::types::WalletId;
use tracing::info;
use uuid::Uuid;

use super::error_response;
use crate::AppState;

/// Header carrying the client's idempotency token.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Request body for account setup.
///
/// Both fields are optional; a throwaway test identity is generated when absent.
#[derive(Debug, Default, Deserialize)]
pub struct SetupRequest {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// Request body for a posting.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactRequest {
    /// Target wallet.
    pub wallet_id: WalletId,
    /// Signed amount in minor units.
    pub amount: i64,
    /// `TOPUP`, `BONUS` or `SPEND`.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Caller-supplied reference.
    pub reference_id: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Creates wallet routes.
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/setup", post(setup::<S>))
        .route("/transact", post(transact::<S>))
        .route("/wallet/{id}", get(get_balance::<S>))
        .route("/wallet/{id}/details", get(get_wallet_details::<S>))
}

/// Creates a user and their `GOLD` wallet.
async fn setup<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(payload): Json<SetupRequest>,
) -> Response {
    let token = Uuid::new_v4().simple();
    let name = payload.name.unwrap_or_else(|| format!("TestUser_{token}"));
    let email = payload
        .email
        .unwrap_or_else(|| format!("test_{token}@tally.local"));

    match state
        .ledger
        .setup_account(&name, &email, DEFAULT_ASSET_TYPE)
        .await
    {
        Ok(setup) => {
            info!(wallet_id = %setup.wallet.id, user_id = %setup.user.id, "Account set up");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "walletId": setup.wallet.id,
                    "user": setup.user
                })),
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Posts one ledger entry, honouring an optional `Idempotency-Key` header.
async fn transact<S: LedgerStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(payload): Json<TransactRequest>,
) -> Response {
    let idempotency_key = match idempotency_key(&headers) {
        Ok(key) => key,
        Err(e) => return error_response(&e),
    };

    let mut request = TransactionRequest::new(
        payload.wallet_id,
        payload.amount,
        payload.transaction_type,
        payload.reference_id,
    );
    request.description = payload.description;
    request.idempotency_key = idempotency_key;

    match state.ledger.process(&request).await {
        Ok(entry) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "transaction": entry
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Returns a wallet's derived balance.
async fn get_balance<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Response {
    let result = match parse_wallet_id(&id) {
        Ok(wallet_id) => state.ledger.get_balance(wallet_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(balance) => (StatusCode::OK, Json(balance)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Returns a wallet with its owner and derived balance.
async fn get_wallet_details<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Response {
    let result = match parse_wallet_id(&id) {
        Ok(wallet_id) => state.ledger.get_wallet_details(wallet_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(e) => error_response(&e),
    }
}

fn parse_wallet_id(raw: &str) -> Result<WalletId, LedgerError> {
    WalletId::from_str(raw)
        .map_err(|_| LedgerError::InvalidInput(format!("Invalid wallet id: {raw}")))
}

/// Reads the idempotency key header. Absent means the request is not deduplicated.
fn idempotency_key(headers: &HeaderMap) -> Result<Option<IdempotencyKey>, LedgerError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| {
        LedgerError::InvalidInput("Idempotency-Key must be visible ASCII".to_string())
    })?;
    IdempotencyKey::parse(raw).map(Some)
}
