//! Transaction processing: validate and append one entry atomically.
//!
//! A keyed request whose response is already stored is answered from the
//! store before its payload is validated. Otherwise each attempt runs inside
//! a single unit of work:
//!
//! 1. replay a stored response for the idempotency key, if any
//! 2. lock the wallet row; a missing wallet is `WalletNotFound`
//! 3. replay again, now that any same-key writer holding the lock is done
//! 4. read the balance and validate the posting
//! 5. append the entry and record the response under the key
//! 6. commit
//!
//! Any failure rolls the unit of work back, so no path leaves a partial write.
//! Only store conflicts are retried.

use std::time::Duration;

use tally_shared::LedgerConfig;
use tracing::{debug, info, instrument, warn};

use super::error::LedgerError;
use super::idempotency::IdempotencyGuard;
use super::store::{LedgerStore, UnitOfWork};
use super::types::{LedgerEntry, TransactionRequest};
use super::validation::{validate, validate_sign};

/// Bounded retry of store-level conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below one.
    pub max_attempts: u32,
    /// Base backoff, multiplied by the attempt number.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy, clamping `max_attempts` to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Backoff before the attempt following `attempt`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for RetryPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }
}

/// Validates and commits ledger entries against a store.
#[derive(Debug, Clone)]
pub struct TransactionProcessor<S> {
    store: S,
    guard: IdempotencyGuard,
    retry: RetryPolicy,
}

impl<S: LedgerStore> TransactionProcessor<S> {
    /// Creates a processor over `store`.
    #[must_use]
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self {
            store,
            guard: IdempotencyGuard::new(),
            retry,
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Posts one entry to a wallet.
    ///
    /// With an idempotency key, a request whose key already holds a committed
    /// response returns that response unchanged, whatever its payload. The
    /// payload is only validated when nothing is stored under the key.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` / `InvalidAmountSign` before any unit of work is begun
    /// - `WalletNotFound`, `InsufficientFunds`, `BalanceOverflow` from the unit of work
    /// - `TransientStoreConflict` once store conflicts exhaust the retry policy
    #[instrument(
        skip(self, request),
        fields(
            wallet_id = %request.wallet_id,
            amount = request.amount,
            transaction_type = %request.transaction_type,
        )
    )]
    pub async fn process(&self, request: &TransactionRequest) -> Result<LedgerEntry, LedgerError> {
        if let Some(key) = &request.idempotency_key
            && let Some(entry) = self.guard.lookup(&self.store, key).await?
        {
            return Ok(entry);
        }

        request.validate_input()?;
        validate_sign(request.transaction_type, request.amount)?;

        let mut attempt = 1;
        loop {
            match self.attempt(request).await {
                Err(err) if err.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        warn!(attempts = attempt, error = %err, "Giving up after store conflicts");
                        return Err(LedgerError::TransientStoreConflict { attempts: attempt });
                    }
                    debug!(attempt, error = %err, "Store conflict, retrying");
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn attempt(&self, request: &TransactionRequest) -> Result<LedgerEntry, LedgerError> {
        let mut uow = self.store.begin().await?;

        match self.run(&mut uow, request).await {
            Ok(entry) => {
                uow.commit().await?;
                Ok(entry)
            }
            Err(LedgerError::IdempotencyConflictLost) => {
                rollback(uow).await;
                match &request.idempotency_key {
                    Some(key) => self.guard.winner(&self.store, key).await,
                    None => Err(LedgerError::IdempotencyConflictLost),
                }
            }
            Err(err) => {
                rollback(uow).await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        uow: &mut S::UnitOfWork,
        request: &TransactionRequest,
    ) -> Result<LedgerEntry, LedgerError> {
        let key = request.idempotency_key.as_ref();

        if let Some(key) = key
            && let Some(entry) = self.guard.replay(uow, key).await?
        {
            return Ok(entry);
        }

        if uow.lock_wallet(request.wallet_id).await?.is_none() {
            return Err(LedgerError::WalletNotFound(request.wallet_id));
        }

        if let Some(key) = key
            && let Some(entry) = self.guard.replay(uow, key).await?
        {
            return Ok(entry);
        }

        let balance = uow.sum_entry_amounts(request.wallet_id).await?;
        let resulting = validate(request.transaction_type, request.amount, balance)?;

        let entry = uow.insert_entry(request.to_new_entry()).await?;

        if let Some(key) = key {
            self.guard.record(uow, key, &entry).await?;
        }

        info!(
            entry_id = %entry.id,
            wallet_id = %entry.wallet_id,
            amount = entry.amount,
            balance = resulting,
            "Ledger entry appended"
        );
        Ok(entry)
    }
}

async fn rollback<U: UnitOfWork>(uow: U) {
    if let Err(err) = uow.rollback().await {
        warn!(error = %err, "Rollback failed");
    }
}
