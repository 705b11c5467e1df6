//! Concurrent processing tests against the in-memory store.
//!
//! These tests verify that:
//! - Concurrent credits and debits on one wallet leave the exact expected balance
//! - Concurrent overdrafts are admitted only while funds remain
//! - Concurrent submissions with one idempotency key apply once

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::items_after_statements)]

use std::sync::Arc;

use futures::future::join_all;
use tally_core::ledger::{
    IdempotencyKey, LedgerError, LedgerService, TransactionRequest, TransactionType,
};
use tally_core::memory::InMemoryStore;
use tally_shared::LedgerConfig;
use tally_shared::types::WalletId;
use tokio::sync::Barrier;

async fn funded_wallet(
    service: &LedgerService<InMemoryStore>,
    initial: i64,
) -> WalletId {
    let setup = service
        .setup_account("Concurrent", "concurrent@example.com", "GOLD")
        .await
        .expect("setup account");
    if initial > 0 {
        service
            .process(&TransactionRequest::new(
                setup.wallet.id,
                initial,
                TransactionType::Topup,
                "initial",
            ))
            .await
            .expect("initial topup");
    }
    setup.wallet.id
}

fn service(store: &InMemoryStore) -> LedgerService<InMemoryStore> {
    LedgerService::new(store.clone(), &LedgerConfig::default())
}

// ============================================================================
// 25 concurrent +10 and 25 concurrent -10 on a balance of 1000
// ============================================================================
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_postings_keep_exact_balance() {
    let store = InMemoryStore::new();
    let service = service(&store);
    let wallet_id = funded_wallet(&service, 1000).await;

    const PER_SIDE: usize = 25;
    let barrier = Arc::new(Barrier::new(PER_SIDE * 2));
    let mut handles = Vec::with_capacity(PER_SIDE * 2);

    for i in 0..PER_SIDE * 2 {
        let service = service.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            let request = if i % 2 == 0 {
                TransactionRequest::new(wallet_id, 10, TransactionType::Topup, format!("in-{i}"))
            } else {
                TransactionRequest::new(wallet_id, -10, TransactionType::Spend, format!("out-{i}"))
            };
            barrier.wait().await;
            service.process(&request).await
        }));
    }

    for result in join_all(handles).await {
        result.expect("task panicked").expect("posting failed");
    }

    let balance = service.get_balance(wallet_id).await.unwrap().balance;
    assert_eq!(balance, 1000, "balance drifted to {}", balance);
    assert_eq!(store.entry_count(wallet_id).await, 1 + PER_SIDE * 2);
}

// ============================================================================
// 20 concurrent -10 on a balance of 100: exactly 10 succeed
// ============================================================================
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overdraft_admits_only_available_funds() {
    let store = InMemoryStore::new();
    let service = service(&store);
    let wallet_id = funded_wallet(&service, 100).await;

    const SPENDS: usize = 20;
    let barrier = Arc::new(Barrier::new(SPENDS));
    let mut handles = Vec::with_capacity(SPENDS);

    for i in 0..SPENDS {
        let service = service.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service
                .process(&TransactionRequest::new(
                    wallet_id,
                    -10,
                    TransactionType::Spend,
                    format!("spend-{i}"),
                ))
                .await
        }));
    }

    let mut succeeded = 0;
    let mut insufficient = 0;
    for result in join_all(handles).await {
        match result.expect("task panicked") {
            Ok(_) => succeeded += 1,
            Err(LedgerError::InsufficientFunds { .. }) => insufficient += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(insufficient, 10);
    assert_eq!(service.get_balance(wallet_id).await.unwrap().balance, 0);
    assert_eq!(store.entry_count(wallet_id).await, 11);
}

// ============================================================================
// Concurrent submissions with one idempotency key
// ============================================================================
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_key_applies_once() {
    let store = InMemoryStore::new();
    let service = service(&store);
    let wallet_id = funded_wallet(&service, 500).await;
    let key = IdempotencyKey::parse("checkout-7f3a").unwrap();

    const SUBMISSIONS: usize = 16;
    let barrier = Arc::new(Barrier::new(SUBMISSIONS));
    let mut handles = Vec::with_capacity(SUBMISSIONS);

    for _ in 0..SUBMISSIONS {
        let service = service.clone();
        let barrier = Arc::clone(&barrier);
        let request = TransactionRequest::new(wallet_id, -75, TransactionType::Spend, "checkout")
            .with_idempotency_key(key.clone());
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.process(&request).await
        }));
    }

    let entries: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked").expect("submission failed"))
        .collect();

    assert!(entries.iter().all(|e| e.id == entries[0].id));
    assert_eq!(store.entry_count(wallet_id).await, 2);
    assert_eq!(service.get_balance(wallet_id).await.unwrap().balance, 425);
}

#[tokio::test]
async fn test_new_wallet_reads_zero() {
    let store = InMemoryStore::new();
    let service = service(&store);
    let wallet_id = funded_wallet(&service, 0).await;
    assert_eq!(service.get_balance(wallet_id).await.unwrap().balance, 0);
}
