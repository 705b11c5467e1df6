//! Wallet balance calculation.
//!
//! A wallet's balance is never stored. It is the sum of the amounts of every
//! committed entry, zero for a wallet with no entries.

use super::error::LedgerError;

/// Sums entry amounts into a balance.
///
/// # Errors
///
/// Returns `Store` if the sum leaves the `i64` range, which committed
/// entries can never produce.
pub fn calculate_balance(amounts: impl IntoIterator<Item = i64>) -> Result<i64, LedgerError> {
    amounts.into_iter().try_fold(0i64, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| LedgerError::Store("ledger sum out of range".to_string()))
    })
}
