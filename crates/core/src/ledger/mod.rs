//! Wallet ledger logic.
//!
//! This module implements the transaction-processing core:
//! - Domain types for wallets, entries and transaction requests
//! - Sign and sufficient-funds validation
//! - Balance calculation from committed entries
//! - Idempotency keys and response replay
//! - The store boundary and the atomic transaction processor
//! - The ledger service façade

pub mod balance;
pub mod error;
pub mod idempotency;
pub mod processor;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use balance::calculate_balance;
pub use error::LedgerError;
pub use idempotency::{IdempotencyGuard, IdempotencyKey, IdempotencyRecord};
pub use processor::{RetryPolicy, TransactionProcessor};
pub use service::{AccountSetup, DEFAULT_ASSET_TYPE, LedgerService};
pub use store::{InsertOutcome, LedgerStore, UnitOfWork};
pub use types::{
    LedgerEntry, NewLedgerEntry, NewUser, TransactionRequest, TransactionType, User, Wallet,
    WalletBalance, WalletDetails,
};
pub use validation::{validate, validate_sign};
