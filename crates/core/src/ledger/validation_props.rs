//! Property-based tests for posting validation rules.

use proptest::prelude::*;

use super::balance::calculate_balance;
use super::error::LedgerError;
use super::types::TransactionType;
use super::validation::{validate, validate_sign};

/// Strategy to generate a balance a wallet could hold.
fn balance() -> impl Strategy<Value = i64> {
    0i64..1_000_000_000i64
}

/// Strategy to generate a credit transaction type.
fn credit_type() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Topup), Just(TransactionType::Bonus)]
}

/// Strategy to generate a transaction type with a correctly signed amount.
fn posting() -> impl Strategy<Value = (TransactionType, i64)> {
    prop_oneof![
        (credit_type(), 1i64..10_000),
        (1i64..10_000).prop_map(|amount| (TransactionType::Spend, -amount)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A spend with a non-negative amount is rejected whatever the balance.
    #[test]
    fn prop_spend_requires_negative_amount(
        amount in 0i64..=i64::MAX,
        current in balance(),
    ) {
        let result = validate(TransactionType::Spend, amount, current);
        prop_assert!(
            matches!(result, Err(LedgerError::InvalidAmountSign { .. })),
            "non-negative spend should be rejected, got: {:?}",
            result
        );
    }

    /// A credit with a non-positive amount is rejected whatever the balance.
    #[test]
    fn prop_credit_requires_positive_amount(
        ty in credit_type(),
        amount in i64::MIN..=0i64,
        current in balance(),
    ) {
        let result = validate(ty, amount, current);
        prop_assert!(
            matches!(result, Err(LedgerError::InvalidAmountSign { .. })),
            "non-positive credit should be rejected, got: {:?}",
            result
        );
        prop_assert!(validate_sign(ty, amount).is_err());
    }

    /// A spend larger than the balance is rejected with the balance reported.
    #[test]
    fn prop_overdraft_rejected(current in balance(), excess in 1i64..1_000_000) {
        let amount = -(current + excess);
        let result = validate(TransactionType::Spend, amount, current);
        prop_assert!(
            matches!(
                result,
                Err(LedgerError::InsufficientFunds { balance, requested })
                    if balance == current && requested == amount.unsigned_abs()
            ),
            "overdraft should report the balance, got: {:?}",
            result
        );
    }

    /// An accepted posting yields exactly balance + amount, never negative.
    #[test]
    fn prop_accepted_posting_adds_amount(
        (ty, amount) in posting(),
        current in balance(),
    ) {
        if let Ok(resulting) = validate(ty, amount, current) {
            prop_assert_eq!(resulting, current + amount);
            prop_assert!(resulting >= 0);
        } else {
            prop_assert!(ty.is_debit() && current + amount < 0);
        }
    }

    /// Applying only accepted postings keeps the running balance equal to the
    /// sum of applied amounts and never negative.
    #[test]
    fn prop_running_balance_never_negative(
        postings in prop::collection::vec(posting(), 0..60),
    ) {
        let mut applied = Vec::new();
        let mut running = 0i64;
        for (ty, amount) in postings {
            if let Ok(next) = validate(ty, amount, running) {
                applied.push(amount);
                running = next;
            }
            prop_assert!(running >= 0);
        }
        prop_assert_eq!(calculate_balance(applied).unwrap(), running);
    }
}
