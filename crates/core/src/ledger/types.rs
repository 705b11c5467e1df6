//! Ledger domain types for wallets, entries and transaction requests.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tally_shared::types::{LedgerEntryId, UserId, WalletId};

use super::error::LedgerError;
use super::idempotency::IdempotencyKey;

/// Longest accepted caller reference id.
pub const MAX_REFERENCE_ID_LEN: usize = 255;
/// Longest accepted entry description.
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Longest accepted asset type tag.
pub const MAX_ASSET_TYPE_LEN: usize = 32;

/// Transaction type of a ledger entry.
///
/// Determines the sign an entry's amount must carry:
/// - `Topup` / `Bonus` credit the wallet (amount > 0)
/// - `Spend` debits the wallet (amount < 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Purchased credit.
    Topup,
    /// Promotional credit.
    Bonus,
    /// Consumption of balance.
    Spend,
}

impl TransactionType {
    /// Every transaction type.
    pub const ALL: [Self; 3] = [Self::Topup, Self::Bonus, Self::Spend];

    /// Returns true if entries of this type reduce the balance.
    #[must_use]
    pub const fn is_debit(self) -> bool {
        matches!(self, Self::Spend)
    }

    /// Returns the wire name (`TOPUP`, `BONUS`, `SPEND`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topup => "TOPUP",
            Self::Bonus => "BONUS",
            Self::Spend => "SPEND",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOPUP" => Ok(Self::Topup),
            "BONUS" => Ok(Self::Bonus),
            "SPEND" => Ok(Self::Spend),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

/// A wallet owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique email address.
    pub email: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Fields of a user to be created, checked before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewUser {
    /// Display name, trimmed.
    #[garde(length(chars, min = 1, max = 255))]
    pub name: String,
    /// Email address, trimmed and lowercased.
    #[garde(email, length(chars, max = 255))]
    pub email: String,
}

impl NewUser {
    /// Normalizes raw input and validates it.
    ///
    /// Emails are compared case-insensitively, so they are stored lowercased.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank or oversized name or a malformed email.
    pub fn parse(name: &str, email: &str) -> Result<Self, LedgerError> {
        let user = Self {
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
        };
        user.validate().map_err(invalid_input)?;
        Ok(user)
    }
}

fn invalid_input(report: garde::Report) -> LedgerError {
    LedgerError::InvalidInput(report.to_string().trim().to_string())
}

/// A wallet holding one asset for one owner.
///
/// Wallets carry no balance field; the balance is always derived from entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Unique identifier.
    pub id: WalletId,
    /// The owning user.
    pub owner_id: UserId,
    /// Asset type tag, e.g. `GOLD`.
    pub asset_type: String,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
}

/// A committed, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,
    /// The wallet this entry belongs to.
    pub wallet_id: WalletId,
    /// Signed amount: positive credits, negative debits.
    pub amount: i64,
    /// Entry type.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Caller-supplied reference.
    pub reference_id: String,
    /// Optional description.
    pub description: Option<String>,
    /// When the entry was committed.
    pub created_at: DateTime<Utc>,
}

/// A wallet's derived balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    /// The wallet.
    pub wallet_id: WalletId,
    /// Sum of all committed entry amounts.
    pub balance: i64,
}

/// A wallet with its owner and derived balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDetails {
    /// The wallet's fields.
    #[serde(flatten)]
    pub wallet: Wallet,
    /// The owner, if still present.
    pub owner: Option<User>,
    /// Sum of all committed entry amounts.
    pub balance: i64,
}

/// A validated entry ready to be appended by a store.
///
/// The store assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    /// The wallet to append to.
    pub wallet_id: WalletId,
    /// Signed amount.
    pub amount: i64,
    /// Entry type.
    pub transaction_type: TransactionType,
    /// Caller-supplied reference.
    pub reference_id: String,
    /// Optional description.
    pub description: Option<String>,
}

/// A request to post one entry to a wallet.
///
/// Field bounds match [`MAX_REFERENCE_ID_LEN`] and [`MAX_DESCRIPTION_LEN`].
#[derive(Debug, Clone, Validate)]
pub struct TransactionRequest {
    /// Target wallet.
    #[garde(skip)]
    pub wallet_id: WalletId,
    /// Signed amount.
    #[garde(skip)]
    pub amount: i64,
    /// Declared type; must agree with the amount's sign.
    #[garde(skip)]
    pub transaction_type: TransactionType,
    /// Caller-supplied reference.
    #[garde(length(chars, min = 1, max = 255))]
    pub reference_id: String,
    /// Optional description.
    #[garde(length(chars, max = 1000))]
    pub description: Option<String>,
    /// Optional client token making the request safe to repeat.
    #[garde(skip)]
    pub idempotency_key: Option<IdempotencyKey>,
}

impl TransactionRequest {
    /// Creates a request without description or idempotency key.
    #[must_use]
    pub fn new(
        wallet_id: WalletId,
        amount: i64,
        transaction_type: TransactionType,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            wallet_id,
            amount,
            transaction_type,
            reference_id: reference_id.into(),
            description: None,
            idempotency_key: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    /// Checks the request's own fields, before any store access.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank or oversized reference id or an
    /// oversized description.
    pub fn validate_input(&self) -> Result<(), LedgerError> {
        if self.reference_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "referenceId must not be blank".to_string(),
            ));
        }
        self.validate().map_err(invalid_input)
    }

    /// Builds the entry to append once validation has passed.
    #[must_use]
    pub fn to_new_entry(&self) -> NewLedgerEntry {
        NewLedgerEntry {
            wallet_id: self.wallet_id,
            amount: self.amount,
            transaction_type: self.transaction_type,
            reference_id: self.reference_id.clone(),
            description: self.description.clone(),
        }
    }
}

/// Normalizes an asset type tag to its canonical upper-case form.
///
/// # Errors
///
/// Returns `InvalidInput` unless the tag is 1 to 32 ASCII letters, digits or underscores.
pub fn normalize_asset_type(asset_type: &str) -> Result<String, LedgerError> {
    let tag = asset_type.trim();
    if tag.is_empty() || tag.len() > MAX_ASSET_TYPE_LEN {
        return Err(LedgerError::InvalidInput(format!(
            "assetType must be 1 to {MAX_ASSET_TYPE_LEN} characters"
        )));
    }
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(LedgerError::InvalidInput(
            "assetType may only contain letters, digits and underscores".to_string(),
        ));
    }
    Ok(tag.to_ascii_uppercase())
}
