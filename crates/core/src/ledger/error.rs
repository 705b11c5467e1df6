//! Ledger error types for validation, state and store errors.
//!
//! This module defines all errors that can occur while posting or reading
//! wallet ledger entries: input errors, business-rule rejections, missing
//! records and store failures.

use tally_shared::AppError;
use tally_shared::types::{UserId, WalletId};
use thiserror::Error;

use super::types::TransactionType;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Input Errors ==========
    /// Request failed basic input checks (blank reference, oversized key, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Amount sign contradicts the declared transaction type.
    #[error("{transaction_type} amount must be {}. Provided: {amount}", expected_sign(.transaction_type))]
    InvalidAmountSign {
        /// The declared transaction type.
        transaction_type: TransactionType,
        /// The offending amount.
        amount: i64,
    },

    // ========== Business Rule Errors ==========
    /// A spend would drive the balance below zero.
    #[error("Insufficient funds. Balance: {balance}, Required: {requested}")]
    InsufficientFunds {
        /// Balance before the rejected entry.
        balance: i64,
        /// Magnitude of the rejected spend.
        requested: u64,
    },

    /// The resulting balance does not fit the amount type.
    #[error("Balance overflow. Balance: {balance}, Amount: {amount}")]
    BalanceOverflow {
        /// Balance before the rejected entry.
        balance: i64,
        /// The rejected amount.
        amount: i64,
    },

    // ========== Record Errors ==========
    /// Wallet not found.
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Wallet owner not found.
    #[error("Owner not found: {0}")]
    OwnerNotFound(UserId),

    /// The owner already holds a wallet for this asset.
    #[error("Owner {owner_id} already has a {asset_type} wallet")]
    WalletAlreadyExists {
        /// The owner.
        owner_id: UserId,
        /// The asset type tag.
        asset_type: String,
    },

    /// Email is already registered to another user.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    // ========== Concurrency Errors ==========
    /// The store could not serialize one attempt; the unit of work was rolled back.
    #[error("Store conflict: {0}")]
    StoreConflict(String),

    /// Store conflicts persisted across every allowed attempt.
    #[error("Transaction could not be committed after {attempts} attempts, please retry")]
    TransientStoreConflict {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Another request committed a response for the same idempotency key first.
    ///
    /// Consumed by the processor, which substitutes the winning response.
    #[error("Idempotency key already claimed by a concurrent request")]
    IdempotencyConflictLost,

    // ========== Infrastructure Errors ==========
    /// Response payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(String),
}

fn expected_sign(transaction_type: &TransactionType) -> &'static str {
    if transaction_type.is_debit() {
        "negative"
    } else {
        "positive"
    }
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidAmountSign { .. } => "INVALID_AMOUNT_SIGN",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::WalletNotFound(_) => "WALLET_NOT_FOUND",
            Self::OwnerNotFound(_) => "OWNER_NOT_FOUND",
            Self::WalletAlreadyExists { .. } => "WALLET_ALREADY_EXISTS",
            Self::EmailTaken(_) => "EMAIL_TAKEN",
            Self::StoreConflict(_) => "STORE_CONFLICT",
            Self::TransientStoreConflict { .. } => "TRANSIENT_STORE_CONFLICT",
            Self::IdempotencyConflictLost => "IDEMPOTENCY_CONFLICT_LOST",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - client-correctable
            Self::InvalidInput(_)
            | Self::InvalidAmountSign { .. }
            | Self::InsufficientFunds { .. }
            | Self::BalanceOverflow { .. } => 400,

            // 404 Not Found
            Self::WalletNotFound(_) | Self::OwnerNotFound(_) => 404,

            // 409 Conflict
            Self::WalletAlreadyExists { .. } | Self::EmailTaken(_) => 409,

            // 503 Service Unavailable - transient, client may retry
            Self::StoreConflict(_) | Self::TransientStoreConflict { .. } => 503,

            // 500 Internal Server Error
            Self::IdempotencyConflictLost | Self::Serialization(_) | Self::Store(_) => 500,
        }
    }

    /// Returns true if the processor may retry the unit of work.
    ///
    /// Business-rule rejections are never retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreConflict(_))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InvalidInput(_) | LedgerError::InvalidAmountSign { .. } => {
                Self::Validation(message)
            }
            LedgerError::InsufficientFunds { .. } | LedgerError::BalanceOverflow { .. } => {
                Self::BusinessRule(message)
            }
            LedgerError::WalletNotFound(_) | LedgerError::OwnerNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::WalletAlreadyExists { .. } | LedgerError::EmailTaken(_) => {
                Self::Conflict(message)
            }
            LedgerError::StoreConflict(_) | LedgerError::TransientStoreConflict { .. } => {
                Self::Unavailable(message)
            }
            LedgerError::Store(_) => Self::Database(message),
            LedgerError::IdempotencyConflictLost | LedgerError::Serialization(_) => {
                Self::Internal(message)
            }
        }
    }
}
