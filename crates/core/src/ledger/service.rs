//! Ledger service: the public façade over wallets, balances and postings.

use serde::Serialize;
use tally_shared::LedgerConfig;
use tally_shared::types::{UserId, WalletId};
use tracing::{info, instrument};

use super::error::LedgerError;
use super::processor::{RetryPolicy, TransactionProcessor};
use super::store::LedgerStore;
use super::types::{
    LedgerEntry, NewUser, TransactionRequest, User, Wallet, WalletBalance, WalletDetails,
    normalize_asset_type,
};

/// Asset type given to wallets created by account setup.
pub const DEFAULT_ASSET_TYPE: &str = "GOLD";

/// A freshly set up account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSetup {
    /// The new user.
    pub user: User,
    /// The user's first wallet.
    pub wallet: Wallet,
}

/// Ledger operations over a store.
///
/// Cheap to clone; clones share the store.
#[derive(Debug, Clone)]
pub struct LedgerService<S> {
    processor: TransactionProcessor<S>,
}

impl<S: LedgerStore> LedgerService<S> {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: S, config: &LedgerConfig) -> Self {
        Self {
            processor: TransactionProcessor::new(store, RetryPolicy::from(config)),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        self.processor.store()
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank name or malformed email, and
    /// `EmailTaken` when the email is already registered. Emails are stored
    /// lowercased, so registration is case-insensitive in every store.
    pub async fn create_user(&self, name: &str, email: &str) -> Result<User, LedgerError> {
        let user = NewUser::parse(name, email)?;
        self.store().create_user(&user.name, &user.email).await
    }

    /// Creates an empty wallet for an existing owner.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed asset type, `OwnerNotFound` or
    /// `WalletAlreadyExists`.
    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn create_wallet(
        &self,
        owner_id: UserId,
        asset_type: &str,
    ) -> Result<Wallet, LedgerError> {
        let asset_type = normalize_asset_type(asset_type)?;
        let wallet = self.store().create_wallet(owner_id, &asset_type).await?;
        info!(wallet_id = %wallet.id, asset_type = %wallet.asset_type, "Wallet created");
        Ok(wallet)
    }

    /// Creates a user together with a wallet of `asset_type`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::create_user`] and [`Self::create_wallet`].
    pub async fn setup_account(
        &self,
        name: &str,
        email: &str,
        asset_type: &str,
    ) -> Result<AccountSetup, LedgerError> {
        let user = self.create_user(name, email).await?;
        let wallet = self.create_wallet(user.id, asset_type).await?;
        Ok(AccountSetup { user, wallet })
    }

    /// Posts one entry to a wallet. See [`TransactionProcessor::process`].
    ///
    /// # Errors
    ///
    /// Returns the processor's errors.
    pub async fn process(&self, request: &TransactionRequest) -> Result<LedgerEntry, LedgerError> {
        self.processor.process(request).await
    }

    /// Returns a wallet's current balance.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` for an unknown wallet.
    pub async fn get_balance(&self, wallet_id: WalletId) -> Result<WalletBalance, LedgerError> {
        if self.store().find_wallet(wallet_id).await?.is_none() {
            return Err(LedgerError::WalletNotFound(wallet_id));
        }
        let balance = self.store().sum_entry_amounts(wallet_id).await?;
        Ok(WalletBalance { wallet_id, balance })
    }

    /// Returns a wallet with its owner and current balance.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` for an unknown wallet.
    pub async fn get_wallet_details(&self, wallet_id: WalletId) -> Result<WalletDetails, LedgerError> {
        let wallet = self
            .store()
            .find_wallet(wallet_id)
            .await?
            .ok_or(LedgerError::WalletNotFound(wallet_id))?;
        let owner = self.store().find_user(wallet.owner_id).await?;
        let balance = self.store().sum_entry_amounts(wallet_id).await?;
        Ok(WalletDetails {
            wallet,
            owner,
            balance,
        })
    }
}
