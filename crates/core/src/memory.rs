//! In-memory ledger store.
//!
//! Backs unit and concurrency tests of the core, and any embedding that does
//! not need durability. Each wallet has its own async mutex standing in for
//! the row lock; a unit of work stages its writes and applies them on commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tally_shared::types::{LedgerEntryId, UserId, WalletId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ledger::balance::calculate_balance;
use crate::ledger::error::LedgerError;
use crate::ledger::idempotency::{IdempotencyKey, IdempotencyRecord};
use crate::ledger::store::{InsertOutcome, LedgerStore, UnitOfWork};
use crate::ledger::types::{LedgerEntry, NewLedgerEntry, User, Wallet};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    wallets: HashMap<WalletId, Wallet>,
    wallet_locks: HashMap<WalletId, Arc<Mutex<()>>>,
    entries: Vec<LedgerEntry>,
    records: HashMap<IdempotencyKey, IdempotencyRecord>,
}

impl State {
    fn balance(&self, wallet_id: WalletId, pending: &[LedgerEntry]) -> Result<i64, LedgerError> {
        calculate_balance(
            self.entries
                .iter()
                .chain(pending)
                .filter(|e| e.wallet_id == wallet_id)
                .map(|e| e.amount),
        )
    }
}

/// A ledger store kept entirely in process memory.
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    units_begun: Arc<AtomicU32>,
    failing_commits: Arc<AtomicU32>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` commits fail with a retryable store conflict.
    pub fn fail_next_commits(&self, n: u32) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Number of units of work begun so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.units_begun.load(Ordering::SeqCst)
    }

    /// Committed entries of a wallet, oldest first.
    pub async fn entries(&self, wallet_id: WalletId) -> Vec<LedgerEntry> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.wallet_id == wallet_id)
            .cloned()
            .collect()
    }

    /// Number of committed entries of a wallet.
    pub async fn entry_count(&self, wallet_id: WalletId) -> usize {
        self.entries(wallet_id).await.len()
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    type UnitOfWork = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::UnitOfWork, LedgerError> {
        self.units_begun.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryUnitOfWork {
            store: self.clone(),
            locks: HashMap::new(),
            pending_entries: Vec::new(),
            pending_records: Vec::new(),
        })
    }

    async fn create_user(&self, name: &str, email: &str) -> Result<User, LedgerError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == email) {
            return Err(LedgerError::EmailTaken(email.to_string()));
        }
        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn create_wallet(
        &self,
        owner_id: UserId,
        asset_type: &str,
    ) -> Result<Wallet, LedgerError> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&owner_id) {
            return Err(LedgerError::OwnerNotFound(owner_id));
        }
        if state
            .wallets
            .values()
            .any(|w| w.owner_id == owner_id && w.asset_type == asset_type)
        {
            return Err(LedgerError::WalletAlreadyExists {
                owner_id,
                asset_type: asset_type.to_string(),
            });
        }
        let wallet = Wallet {
            id: WalletId::new(),
            owner_id,
            asset_type: asset_type.to_string(),
            created_at: Utc::now(),
        };
        state.wallets.insert(wallet.id, wallet.clone());
        state.wallet_locks.insert(wallet.id, Arc::new(Mutex::new(())));
        Ok(wallet)
    }

    async fn find_wallet(&self, id: WalletId) -> Result<Option<Wallet>, LedgerError> {
        Ok(self.state.lock().await.wallets.get(&id).cloned())
    }

    async fn sum_entry_amounts(&self, wallet_id: WalletId) -> Result<i64, LedgerError> {
        self.state.lock().await.balance(wallet_id, &[])
    }

    async fn find_idempotency_record(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        Ok(self.state.lock().await.records.get(key).cloned())
    }
}

/// A unit of work over [`InMemoryStore`].
///
/// Holds the locks of every wallet it has locked until commit, rollback or drop.
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    store: InMemoryStore,
    locks: HashMap<WalletId, OwnedMutexGuard<()>>,
    pending_entries: Vec<LedgerEntry>,
    pending_records: Vec<IdempotencyRecord>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_wallet(&mut self, id: WalletId) -> Result<Option<Wallet>, LedgerError> {
        if !self.locks.contains_key(&id) {
            let lock = {
                let state = self.store.state.lock().await;
                match state.wallet_locks.get(&id) {
                    Some(lock) => Arc::clone(lock),
                    None => return Ok(None),
                }
            };
            self.locks.insert(id, lock.lock_owned().await);
        }
        self.store.find_wallet(id).await
    }

    async fn sum_entry_amounts(&mut self, wallet_id: WalletId) -> Result<i64, LedgerError> {
        self.store
            .state
            .lock()
            .await
            .balance(wallet_id, &self.pending_entries)
    }

    async fn find_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        if let Some(record) = self.pending_records.iter().find(|r| &r.key == key) {
            return Ok(Some(record.clone()));
        }
        self.store.find_idempotency_record(key).await
    }

    async fn insert_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
        response: &serde_json::Value,
    ) -> Result<InsertOutcome, LedgerError> {
        let taken = self.pending_records.iter().any(|r| &r.key == key)
            || self.store.state.lock().await.records.contains_key(key);
        if taken {
            return Ok(InsertOutcome::Conflict);
        }
        self.pending_records.push(IdempotencyRecord {
            key: key.clone(),
            response: response.clone(),
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn insert_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        let entry = LedgerEntry {
            id: LedgerEntryId::new(),
            wallet_id: entry.wallet_id,
            amount: entry.amount,
            transaction_type: entry.transaction_type,
            reference_id: entry.reference_id,
            description: entry.description,
            created_at: Utc::now(),
        };
        self.pending_entries.push(entry.clone());
        Ok(entry)
    }

    async fn commit(self) -> Result<(), LedgerError> {
        if self.store.take_injected_failure() {
            return Err(LedgerError::StoreConflict(
                "injected commit failure".to_string(),
            ));
        }

        let mut state = self.store.state.lock().await;
        // A key committed by another unit of work after our insert check.
        if let Some(record) = self
            .pending_records
            .iter()
            .find(|r| state.records.contains_key(&r.key))
        {
            return Err(LedgerError::StoreConflict(format!(
                "idempotency key '{}' committed concurrently",
                record.key
            )));
        }
        state.entries.extend(self.pending_entries);
        for record in self.pending_records {
            state.records.insert(record.key.clone(), record);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        Ok(())
    }
}
