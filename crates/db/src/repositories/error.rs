//! Mapping of database errors onto ledger errors.

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tally_core::ledger::LedgerError;

/// `serialization_failure`
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";

/// Returns the SQLSTATE code carried by a database error, if any.
pub(crate) fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(db))) => {
            db.code().map(std::borrow::Cow::into_owned)
        }
        _ => None,
    }
}

/// Returns true for failures the store resolves by running the unit of work again.
pub(crate) fn is_transient(err: &DbErr) -> bool {
    matches!(
        sqlstate(err).as_deref(),
        Some(SQLSTATE_SERIALIZATION_FAILURE | SQLSTATE_DEADLOCK_DETECTED)
    )
}

/// Converts a database error into a ledger error.
///
/// Serialization failures and deadlocks become the retryable `StoreConflict`;
/// everything else is an opaque `Store` error.
pub(crate) fn store_error(err: DbErr) -> LedgerError {
    if is_transient(&err) {
        LedgerError::StoreConflict(err.to_string())
    } else {
        LedgerError::Store(err.to_string())
    }
}

/// Returns true if the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Returns true if the error is a foreign key violation.
pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
