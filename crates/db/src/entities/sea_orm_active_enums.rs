//! `SeaORM` active enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::TransactionType;

/// Postgres `ledger_entry_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ledger_entry_type")]
pub enum LedgerEntryType {
    /// Purchased credit.
    #[sea_orm(string_value = "TOPUP")]
    Topup,
    /// Promotional credit.
    #[sea_orm(string_value = "BONUS")]
    Bonus,
    /// Consumption of balance.
    #[sea_orm(string_value = "SPEND")]
    Spend,
}

impl From<TransactionType> for LedgerEntryType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Topup => Self::Topup,
            TransactionType::Bonus => Self::Bonus,
            TransactionType::Spend => Self::Spend,
        }
    }
}

impl From<LedgerEntryType> for TransactionType {
    fn from(value: LedgerEntryType) -> Self {
        match value {
            LedgerEntryType::Topup => Self::Topup,
            LedgerEntryType::Bonus => Self::Bonus,
            LedgerEntryType::Spend => Self::Spend,
        }
    }
}
