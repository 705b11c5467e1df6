//! Postgres implementation of the ledger store.
//!
//! A unit of work is a `SeaORM` database transaction at the default
//! READ COMMITTED isolation. Writers of one wallet are serialized by
//! `SELECT ... FOR UPDATE` on the wallet row, and every statement after the
//! lock sees all entries committed before it was granted.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tally_core::ledger::{
    IdempotencyKey, IdempotencyRecord, InsertOutcome, LedgerEntry, LedgerError, LedgerStore,
    NewLedgerEntry, UnitOfWork, User, Wallet,
};
use tally_shared::types::{LedgerEntryId, UserId, WalletId};
use tracing::debug;

use super::error::{is_foreign_key_violation, is_unique_violation, store_error};
use crate::entities::{idempotency_records, ledger_entries, users, wallets};

/// Ledger store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over a connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type UnitOfWork = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::UnitOfWork, LedgerError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        Ok(PgUnitOfWork { txn })
    }

    async fn create_user(&self, name: &str, email: &str) -> Result<User, LedgerError> {
        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            created_at: Set(Utc::now().into()),
        };

        match user.insert(&self.db).await {
            Ok(model) => Ok(model.into_user()),
            Err(err) if is_unique_violation(&err) => Err(LedgerError::EmailTaken(email.to_string())),
            Err(err) => Err(store_error(err)),
        }
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerError> {
        let model = users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(users::Model::into_user))
    }

    async fn create_wallet(
        &self,
        owner_id: UserId,
        asset_type: &str,
    ) -> Result<Wallet, LedgerError> {
        let wallet = wallets::ActiveModel {
            id: Set(WalletId::new().into_inner()),
            user_id: Set(owner_id.into_inner()),
            asset_type: Set(asset_type.to_string()),
            created_at: Set(Utc::now().into()),
        };

        match wallet.insert(&self.db).await {
            Ok(model) => Ok(model.into_wallet()),
            Err(err) if is_foreign_key_violation(&err) => Err(LedgerError::OwnerNotFound(owner_id)),
            Err(err) if is_unique_violation(&err) => Err(LedgerError::WalletAlreadyExists {
                owner_id,
                asset_type: asset_type.to_string(),
            }),
            Err(err) => Err(store_error(err)),
        }
    }

    async fn find_wallet(&self, id: WalletId) -> Result<Option<Wallet>, LedgerError> {
        let model = wallets::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(wallets::Model::into_wallet))
    }

    async fn sum_entry_amounts(&self, wallet_id: WalletId) -> Result<i64, LedgerError> {
        sum_entry_amounts(&self.db, wallet_id).await
    }

    async fn find_idempotency_record(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        find_idempotency_record(&self.db, key).await
    }
}

/// A unit of work over one Postgres transaction.
///
/// Dropping it without commit rolls the transaction back.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_wallet(&mut self, id: WalletId) -> Result<Option<Wallet>, LedgerError> {
        let model = wallets::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        if model.is_some() {
            debug!(wallet_id = %id, "Wallet row locked");
        }
        Ok(model.map(wallets::Model::into_wallet))
    }

    async fn sum_entry_amounts(&mut self, wallet_id: WalletId) -> Result<i64, LedgerError> {
        sum_entry_amounts(&self.txn, wallet_id).await
    }

    async fn find_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        find_idempotency_record(&self.txn, key).await
    }

    async fn insert_idempotency_record(
        &mut self,
        key: &IdempotencyKey,
        response: &serde_json::Value,
    ) -> Result<InsertOutcome, LedgerError> {
        let record = idempotency_records::ActiveModel {
            key: Set(key.as_str().to_string()),
            response: Set(response.clone()),
            created_at: Set(Utc::now().into()),
        };

        let inserted = idempotency_records::Entity::insert(record)
            .on_conflict(
                OnConflict::column(idempotency_records::Column::Key)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;

        Ok(if inserted == 0 {
            InsertOutcome::Conflict
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn insert_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        let model = ledger_entries::ActiveModel {
            id: Set(LedgerEntryId::new().into_inner()),
            wallet_id: Set(entry.wallet_id.into_inner()),
            amount: Set(entry.amount),
            entry_type: Set(entry.transaction_type.into()),
            reference_id: Set(entry.reference_id),
            description: Set(entry.description),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.txn)
        .await
        .map_err(store_error)?;

        Ok(model.into_entry())
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(store_error)
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.txn.rollback().await.map_err(store_error)
    }
}

/// `COALESCE(SUM(amount), 0)` over a wallet's entries.
///
/// `SUM(bigint)` yields `numeric` in Postgres, hence the cast back.
async fn sum_entry_amounts<C: ConnectionTrait>(
    conn: &C,
    wallet_id: WalletId,
) -> Result<i64, LedgerError> {
    let balance: Option<i64> = ledger_entries::Entity::find()
        .select_only()
        .column_as(Expr::cust("COALESCE(SUM(amount), 0)::BIGINT"), "balance")
        .filter(ledger_entries::Column::WalletId.eq(wallet_id.into_inner()))
        .into_tuple()
        .one(conn)
        .await
        .map_err(store_error)?;
    Ok(balance.unwrap_or(0))
}

async fn find_idempotency_record<C: ConnectionTrait>(
    conn: &C,
    key: &IdempotencyKey,
) -> Result<Option<IdempotencyRecord>, LedgerError> {
    let model = idempotency_records::Entity::find_by_id(key.as_str().to_string())
        .one(conn)
        .await
        .map_err(store_error)?;
    Ok(model.map(|m| IdempotencyRecord {
        key: key.clone(),
        response: m.response,
        created_at: m.created_at.with_timezone(&Utc),
    }))
}

impl users::Model {
    fn into_user(self) -> User {
        User {
            id: UserId::from_uuid(self.id),
            name: self.name,
            email: self.email,
            created_at: self.created_at.with_timezone(&Utc),
        }
    }
}

impl wallets::Model {
    fn into_wallet(self) -> Wallet {
        Wallet {
            id: WalletId::from_uuid(self.id),
            owner_id: UserId::from_uuid(self.user_id),
            asset_type: self.asset_type,
            created_at: self.created_at.with_timezone(&Utc),
        }
    }
}

impl ledger_entries::Model {
    fn into_entry(self) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::from_uuid(self.id),
            wallet_id: WalletId::from_uuid(self.wallet_id),
            amount: self.amount,
            transaction_type: self.entry_type.into(),
            reference_id: self.reference_id,
            description: self.description,
            created_at: self.created_at.with_timezone(&Utc),
        }
    }
}
