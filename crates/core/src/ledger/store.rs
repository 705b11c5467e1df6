//! Storage boundary consumed by the ledger.
//!
//! The core never talks to a database directly. A store hands out units of
//! work; every read and write that must be atomic goes through one.

use async_trait::async_trait;
use tally_shared::types::{UserId, WalletId};

use super::error::LedgerError;
use super::idempotency::{IdempotencyKey, IdempotencyRecord};
use super::types::{LedgerEntry, NewLedgerEntry, User, Wallet};

/// Result of inserting an idempotency record with conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written by this unit of work.
    Inserted,
    /// A record with the same key already exists.
    Conflict,
}

/// A durable store of users, wallets, ledger entries and idempotency records.
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    /// The atomic unit of work this store hands out.
    type UnitOfWork: UnitOfWork;

    /// Opens a unit of work.
    async fn begin(&self) -> Result<Self::UnitOfWork, LedgerError>;

    /// Creates a user.
    ///
    /// Fails with `EmailTaken` when the email is already registered.
    async fn create_user(&self, name: &str, email: &str) -> Result<User, LedgerError>;

    /// Finds a user by id.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerError>;

    /// Creates a wallet with no entries.
    ///
    /// Fails with `OwnerNotFound` for an unknown owner and
    /// `WalletAlreadyExists` when the owner already holds this asset.
    async fn create_wallet(&self, owner_id: UserId, asset_type: &str)
    -> Result<Wallet, LedgerError>;

    /// Finds a wallet by id without locking it.
    async fn find_wallet(&self, id: WalletId) -> Result<Option<Wallet>, LedgerError>;

    /// Sums the amounts of all committed entries of a wallet.
    async fn sum_entry_amounts(&self, wallet_id: WalletId) -> Result<i64, LedgerError>;

    /// Looks up a committed idempotency record.
    async fn find_idempotency_record(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError>;
}

/// An atomic, all-or-nothing group of reads and writes.
///
/// Dropping a unit of work without committing discards its writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Loads a wallet and holds an exclusive lock on it until commit or rollback.
    async fn lock_wallet(&mut self, id: WalletId) -> Result<Option<Wallet>, LedgerError>;

    /// Sums the entry amounts of a wallet as seen by this unit of work.
    async fn sum_entry_amounts(&mut self, wallet_id: WalletId) -> Result<i64, LedgerError>;

    /// Looks up an idempotency record as seen by this unit of work.
    async fn find_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError>;

    /// Inserts an idempotency record unless the key is already taken.
    async fn insert_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
        response: &serde_json::Value,
    ) -> Result<InsertOutcome, LedgerError>;

    /// Appends a ledger entry.
    async fn insert_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError>;

    /// Makes every write of this unit of work durable.
    async fn commit(self) -> Result<(), LedgerError>;

    /// Discards every write of this unit of work.
    async fn rollback(self) -> Result<(), LedgerError>;
}
