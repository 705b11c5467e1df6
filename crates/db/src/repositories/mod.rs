//! Repository abstractions for data access.
//!
//! Repositories hide the `SeaORM` implementation details behind the ledger
//! store traits defined in `tally-core`.

mod error;
pub mod ledger_store;

pub use ledger_store::{PgLedgerStore, PgUnitOfWork};
