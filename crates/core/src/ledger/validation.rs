//! Business rule validation for ledger postings.

use super::error::LedgerError;
use super::types::TransactionType;

/// Checks that `amount` carries the sign its transaction type demands.
///
/// Debits must be strictly negative, credits strictly positive. Zero is
/// never valid.
///
/// # Errors
///
/// Returns `InvalidAmountSign` when the sign contradicts the type.
pub fn validate_sign(transaction_type: TransactionType, amount: i64) -> Result<(), LedgerError> {
    let sign_ok = if transaction_type.is_debit() {
        amount < 0
    } else {
        amount > 0
    };
    if sign_ok {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmountSign {
            transaction_type,
            amount,
        })
    }
}

/// Validates a posting against the wallet's current balance.
///
/// Returns the balance the wallet will hold once the entry is appended.
/// Only debits can be rejected for insufficient funds; a credit is accepted
/// whatever the current balance.
///
/// # Errors
///
/// - `InvalidAmountSign` if the amount's sign contradicts the type
/// - `BalanceOverflow` if the resulting balance does not fit in `i64`
/// - `InsufficientFunds` if a debit would drive the balance below zero
pub fn validate(
    transaction_type: TransactionType,
    amount: i64,
    current_balance: i64,
) -> Result<i64, LedgerError> {
    validate_sign(transaction_type, amount)?;

    let Some(resulting) = current_balance.checked_add(amount) else {
        return Err(LedgerError::BalanceOverflow {
            balance: current_balance,
            amount,
        });
    };

    if transaction_type.is_debit() && resulting < 0 {
        return Err(LedgerError::InsufficientFunds {
            balance: current_balance,
            requested: amount.unsigned_abs(),
        });
    }

    Ok(resulting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TransactionType::Topup, 1)]
    #[case(TransactionType::Topup, i64::MAX)]
    #[case(TransactionType::Bonus, 100)]
    #[case(TransactionType::Spend, -1)]
    #[case(TransactionType::Spend, i64::MIN)]
    fn test_validate_sign_accepts(#[case] ty: TransactionType, #[case] amount: i64) {
        assert!(validate_sign(ty, amount).is_ok());
    }

    #[rstest]
    #[case(TransactionType::Topup, 0)]
    #[case(TransactionType::Topup, -5)]
    #[case(TransactionType::Bonus, 0)]
    #[case(TransactionType::Bonus, -1)]
    #[case(TransactionType::Spend, 0)]
    #[case(TransactionType::Spend, 50)]
    fn test_validate_sign_rejects(#[case] ty: TransactionType, #[case] amount: i64) {
        assert!(matches!(
            validate_sign(ty, amount),
            Err(LedgerError::InvalidAmountSign { transaction_type, amount: a })
                if transaction_type == ty && a == amount
        ));
    }

    #[test]
    fn test_spend_within_balance() {
        assert_eq!(validate(TransactionType::Spend, -30, 100).unwrap(), 70);
    }

    #[test]
    fn test_spend_to_exactly_zero() {
        assert_eq!(validate(TransactionType::Spend, -100, 100).unwrap(), 0);
    }

    #[test]
    fn test_spend_over_balance_rejected() {
        let err = validate(TransactionType::Spend, -50, 30).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                balance: 30,
                requested: 50
            }
        ));
    }

    #[test]
    fn test_sign_checked_before_funds() {
        let err = validate(TransactionType::Spend, 50, 0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmountSign { .. }));
    }

    #[test]
    fn test_credit_accepted_on_zero_balance() {
        assert_eq!(validate(TransactionType::Topup, 100, 0).unwrap(), 100);
        assert_eq!(validate(TransactionType::Bonus, 5, 0).unwrap(), 5);
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let err = validate(TransactionType::Topup, 1, i64::MAX).unwrap_err();
        assert!(matches!(err, LedgerError::BalanceOverflow { .. }));
    }

    #[test]
    fn test_min_amount_spend_reports_magnitude() {
        let err = validate(TransactionType::Spend, i64::MIN, 0).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { balance: 0, requested } if requested == i64::MIN.unsigned_abs()
        ));
    }
}
