//! Core business logic for Tally.
//!
//! This crate contains the wallet ledger with ZERO web or database dependencies.
//! Storage is reached only through the [`ledger::LedgerStore`] trait.
//!
//! # Modules
//!
//! - `ledger` - Validation, balances, idempotency and atomic transaction processing
//! - `memory` - In-memory store implementation

pub mod ledger;
pub mod memory;
