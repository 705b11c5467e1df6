//! Idempotency keys and the guard that replays recorded responses.
//!
//! A client may attach a key to a request. The first successful run stores
//! its response under the key inside the same unit of work as the ledger
//! append; every later request with that key gets the stored response back
//! instead of executing again.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::LedgerError;
use super::store::{InsertOutcome, LedgerStore, UnitOfWork};

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// A validated client idempotency token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Parses a raw key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank key or one longer than 255 characters.
    pub fn parse(raw: impl Into<String>) -> Result<Self, LedgerError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "Idempotency-Key must not be blank".to_string(),
            ));
        }
        if raw.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "Idempotency-Key exceeds {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }
        Ok(Self(raw))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

/// A committed response stored under an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyRecord {
    /// The client token.
    pub key: IdempotencyKey,
    /// The serialized response of the first successful run.
    pub response: serde_json::Value,
    /// When the record was committed.
    pub created_at: DateTime<Utc>,
}

/// Replays and records responses keyed by idempotency tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdempotencyGuard;

impl IdempotencyGuard {
    /// Creates a guard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the stored response for `key` as seen by `uow`, if any.
    ///
    /// # Errors
    ///
    /// Returns store errors, or `Serialization` if the stored payload no
    /// longer decodes.
    pub async fn replay<U, T>(&self, uow: &mut U, key: &IdempotencyKey) -> Result<Option<T>, LedgerError>
    where
        U: UnitOfWork,
        T: DeserializeOwned,
    {
        match uow.find_idempotency_record(key).await? {
            Some(record) => {
                info!(idempotency_key = %key, "Replaying stored response");
                Self::decode(record).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Returns the committed response for `key`, if any, outside a unit of work.
    ///
    /// # Errors
    ///
    /// Returns store errors, or `Serialization` if the stored payload no
    /// longer decodes.
    pub async fn lookup<S, T>(&self, store: &S, key: &IdempotencyKey) -> Result<Option<T>, LedgerError>
    where
        S: LedgerStore,
        T: DeserializeOwned,
    {
        match store.find_idempotency_record(key).await? {
            Some(record) => {
                info!(idempotency_key = %key, "Replaying stored response");
                Self::decode(record).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Stores `response` under `key` within `uow`.
    ///
    /// # Errors
    ///
    /// Returns `IdempotencyConflictLost` when another unit of work already
    /// committed a record for the key. The caller must roll back and fetch
    /// the winner with [`IdempotencyGuard::winner`].
    pub async fn record<U, T>(&self, uow: &mut U, key: &IdempotencyKey, response: &T) -> Result<(), LedgerError>
    where
        U: UnitOfWork,
        T: Serialize,
    {
        let payload = Self::encode(response)?;
        match uow.insert_idempotency_record(key, &payload).await? {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::Conflict => {
                warn!(idempotency_key = %key, "Lost idempotency race to a concurrent request");
                Err(LedgerError::IdempotencyConflictLost)
            }
        }
    }

    /// Reads the winning response after a lost race.
    ///
    /// # Errors
    ///
    /// Returns `StoreConflict` if the winner's record is not yet visible, so
    /// the caller's retry loop runs the request again.
    pub async fn winner<S, T>(&self, store: &S, key: &IdempotencyKey) -> Result<T, LedgerError>
    where
        S: LedgerStore,
        T: DeserializeOwned,
    {
        match store.find_idempotency_record(key).await? {
            Some(record) => {
                info!(idempotency_key = %key, "Returning winner's stored response");
                Self::decode(record)
            }
            None => Err(LedgerError::StoreConflict(format!(
                "idempotency record for key '{key}' not visible after conflict"
            ))),
        }
    }

    /// Serializes a response payload for storage.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the value cannot be encoded.
    pub fn encode<T: Serialize>(response: &T) -> Result<serde_json::Value, LedgerError> {
        Ok(serde_json::to_value(response)?)
    }

    /// Deserializes a stored record's payload.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(record: IdempotencyRecord) -> Result<T, LedgerError> {
        Ok(serde_json::from_value(record.response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_regular_keys() {
        let key = IdempotencyKey::parse("order-42-attempt").unwrap();
        assert_eq!(key.as_str(), "order-42-attempt");
        assert_eq!(key.to_string(), "order-42-attempt");
    }

    #[test]
    fn test_parse_rejects_blank_and_long_keys() {
        assert!(matches!(
            IdempotencyKey::parse("  "),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(IdempotencyKey::parse("k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1)).is_err());
        assert!(IdempotencyKey::parse("k".repeat(MAX_IDEMPOTENCY_KEY_LEN)).is_ok());
    }

    #[test]
    fn test_key_deserialization_validates() {
        assert!(serde_json::from_str::<IdempotencyKey>("\"abc\"").is_ok());
        assert!(serde_json::from_str::<IdempotencyKey>("\"\"").is_err());
    }

    #[test]
    fn test_decode_mismatched_payload() {
        let record = IdempotencyRecord {
            key: IdempotencyKey::parse("k").unwrap(),
            response: serde_json::json!({"unexpected": true}),
            created_at: Utc::now(),
        };
        let result: Result<i64, _> = IdempotencyGuard::decode(record);
        assert!(matches!(result, Err(LedgerError::Serialization(_))));
    }
}
