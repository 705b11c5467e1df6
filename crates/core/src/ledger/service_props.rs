//! Property-based tests for `LedgerService` over the in-memory store.

use proptest::prelude::*;
use tally_shared::LedgerConfig;

use super::error::LedgerError;
use super::idempotency::IdempotencyKey;
use super::service::LedgerService;
use super::types::{TransactionRequest, TransactionType};
use crate::memory::InMemoryStore;

/// Strategy to generate a signed amount of either direction.
fn signed_amount() -> impl Strategy<Value = i64> {
    prop_oneof![1i64..500, -500i64..0]
}

fn transaction_type_for(amount: i64) -> TransactionType {
    if amount < 0 {
        TransactionType::Spend
    } else {
        TransactionType::Topup
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// After any sequence of postings the balance equals the sum of the
    /// committed entries and is never negative.
    #[test]
    fn prop_balance_is_sum_of_committed_entries(
        amounts in prop::collection::vec(signed_amount(), 0..40),
    ) {
        runtime().block_on(async {
            let store = InMemoryStore::new();
            let service = LedgerService::new(store.clone(), &LedgerConfig::default());
            let setup = service
                .setup_account("Prop", "prop@example.com", "GOLD")
                .await
                .unwrap();
            let wallet_id = setup.wallet.id;

            for (i, amount) in amounts.into_iter().enumerate() {
                let request = TransactionRequest::new(
                    wallet_id,
                    amount,
                    transaction_type_for(amount),
                    format!("ref-{i}"),
                );
                match service.process(&request).await {
                    Ok(entry) => prop_assert_eq!(entry.amount, amount),
                    Err(err) => prop_assert!(
                        matches!(err, LedgerError::InsufficientFunds { .. }),
                        "unexpected rejection: {:?}", err
                    ),
                }
                let balance = service.get_balance(wallet_id).await.unwrap().balance;
                prop_assert!(balance >= 0);
            }

            let committed: i64 = store.entries(wallet_id).await.iter().map(|e| e.amount).sum();
            prop_assert_eq!(service.get_balance(wallet_id).await.unwrap().balance, committed);
            Ok(())
        })?;
    }

    /// Repeating a keyed request any number of times yields one entry.
    #[test]
    fn prop_keyed_repeats_apply_once(
        amount in 1i64..1_000,
        repeats in 1usize..6,
    ) {
        runtime().block_on(async {
            let store = InMemoryStore::new();
            let service = LedgerService::new(store.clone(), &LedgerConfig::default());
            let setup = service
                .setup_account("Prop", "prop@example.com", "GOLD")
                .await
                .unwrap();
            let key = IdempotencyKey::parse("repeat-me").unwrap();
            let request = TransactionRequest::new(setup.wallet.id, amount, TransactionType::Bonus, "promo")
                .with_idempotency_key(key);

            let first = service.process(&request).await.unwrap();
            for _ in 0..repeats {
                prop_assert_eq!(&service.process(&request).await.unwrap(), &first);
            }
            prop_assert_eq!(store.entry_count(setup.wallet.id).await, 1);
            prop_assert_eq!(service.get_balance(setup.wallet.id).await.unwrap().balance, amount);
            Ok(())
        })?;
    }
}
