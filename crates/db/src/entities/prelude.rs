//! Entity re-exports.

pub use super::idempotency_records::Entity as IdempotencyRecords;
pub use super::ledger_entries::Entity as LedgerEntries;
pub use super::users::Entity as Users;
pub use super::wallets::Entity as Wallets;
