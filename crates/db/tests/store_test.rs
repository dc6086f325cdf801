//! Transfer coordinator against Postgres.
//!
//! These tests verify that:
//! - A transfer writes one transfer, two entries, and two balance updates atomically
//! - Concurrent transfers on the same pair of accounts produce exact balances
//! - Transfers in opposite directions do not deadlock
//! - Failed transfers leave no trace
//! - A transfer blocked on a locked row returns within the configured bound

#![allow(clippy::cast_possible_wrap)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use simplebank_core::ledger::{LedgerError, LedgerQueries, TransactionalStore, UnitOfWork};
use simplebank_core::transfer::{TransferCoordinator, TransferTxInput};
use simplebank_shared::types::{AccountId, PageRequest};
use tokio::sync::Barrier;

use common::{create_account, setup};

#[tokio::test]
async fn test_transfer_commits_all_writes() {
    let Some(store) = setup().await else { return };
    let a = create_account(&store, 100).await;
    let b = create_account(&store, 50).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

    let result = coordinator
        .transfer(TransferTxInput::new(a.id, b.id, 30))
        .await
        .unwrap();

    assert_eq!(result.transfer.from_account_id, a.id);
    assert_eq!(result.transfer.to_account_id, b.id);
    assert_eq!(result.transfer.amount, 30);
    assert_eq!(result.from_entry.amount, -30);
    assert_eq!(result.to_entry.amount, 30);
    assert_eq!(result.from_account.balance, 70);
    assert_eq!(result.to_account.balance, 80);

    assert_eq!(store.get_account(a.id).await.unwrap().balance, 70);
    assert_eq!(store.get_account(b.id).await.unwrap().balance, 80);
    assert_eq!(
        store.get_transfer(result.transfer.id).await.unwrap(),
        result.transfer
    );
    assert_eq!(
        store.get_entry(result.from_entry.id).await.unwrap(),
        result.from_entry
    );
}

#[tokio::test]
async fn test_concurrent_transfers_same_direction() {
    let Some(store) = setup().await else { return };
    let a = create_account(&store, 1000).await;
    let b = create_account(&store, 1000).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

    const N: usize = 5;
    const AMOUNT: i64 = 10;
    let barrier = Arc::new(Barrier::new(N));
    let input = TransferTxInput::new(a.id, b.id, AMOUNT);

    let handles = (0..N).map(|_| {
        let coordinator = coordinator.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            coordinator.transfer(input).await
        })
    });
    let results = join_all(handles).await;

    let mut debits = HashSet::new();
    for result in results {
        let result = result.expect("task panicked").expect("transfer failed");
        let k = (a.balance - result.from_account.balance) / AMOUNT;
        assert!((1..=N as i64).contains(&k));
        assert_eq!(result.to_account.balance - b.balance, k * AMOUNT);
        assert!(debits.insert(k), "two transfers observed the same balance");
    }
    assert_eq!(debits.len(), N);

    assert_eq!(store.get_account(a.id).await.unwrap().balance, 950);
    assert_eq!(store.get_account(b.id).await.unwrap().balance, 1050);

    let credits = store
        .list_entries(b.id, PageRequest::new(100, 0))
        .await
        .unwrap();
    assert_eq!(credits.len(), N);
    assert!(credits.iter().all(|e| e.amount == AMOUNT));
}

#[tokio::test]
async fn test_opposite_directions_do_not_deadlock() {
    let Some(store) = setup().await else { return };
    let a = create_account(&store, 1000).await;
    let b = create_account(&store, 1000).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

    const N: usize = 10;
    let barrier = Arc::new(Barrier::new(N));
    let (a_id, b_id) = (a.id, b.id);

    let handles = (0..N).map(|i| {
        let coordinator = coordinator.clone();
        let barrier = Arc::clone(&barrier);
        let input = if i % 2 == 0 {
            TransferTxInput::new(a_id, b_id, 10)
        } else {
            TransferTxInput::new(b_id, a_id, 10)
        };
        tokio::spawn(async move {
            barrier.wait().await;
            coordinator.transfer(input).await
        })
    });

    let results = tokio::time::timeout(Duration::from_secs(10), join_all(handles))
        .await
        .expect("transfers deadlocked");
    for result in results {
        result.expect("task panicked").expect("transfer failed");
    }

    assert_eq!(store.get_account(a.id).await.unwrap().balance, 1000);
    assert_eq!(store.get_account(b.id).await.unwrap().balance, 1000);
}

#[tokio::test]
async fn test_failed_transfer_leaves_no_trace() {
    let Some(store) = setup().await else { return };
    let a = create_account(&store, 100).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

    let err = coordinator
        .transfer(TransferTxInput::new(a.id, AccountId::new(i64::MAX), 10))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Constraint(_)));

    assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
    let entries = store
        .list_entries(a.id, PageRequest::new(10, 0))
        .await
        .unwrap();
    assert!(entries.is_empty());
    let transfers = store
        .list_transfers(a.id, a.id, PageRequest::new(10, 0))
        .await
        .unwrap();
    assert!(transfers.is_empty());
}

#[tokio::test]
async fn test_invalid_amount_rejected() {
    let Some(store) = setup().await else { return };
    let a = create_account(&store, 100).await;
    let b = create_account(&store, 100).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

    let err = coordinator
        .transfer(TransferTxInput::new(a.id, b.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(0)));
    assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
}

#[tokio::test]
async fn test_uncommitted_writes_are_invisible() {
    let Some(store) = setup().await else { return };
    let a = create_account(&store, 100).await;

    let tx = store.begin().await.unwrap();
    tx.add_account_balance(a.id, 50).await.unwrap();
    assert_eq!(tx.get_account(a.id).await.unwrap().balance, 150);
    assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);

    tx.rollback().await.unwrap();
    assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
}

#[tokio::test]
async fn test_locked_row_times_out_transfer() {
    let Some(store) = setup().await else { return };
    let limit = Duration::from_millis(200);
    let store = store.with_timeout(Some(limit));
    let a = create_account(&store, 100).await;
    let b = create_account(&store, 100).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone())).with_timeout(Some(limit));
    let input = TransferTxInput::new(a.id, b.id, 10);

    let holder = store.begin().await.unwrap();
    holder.get_account_for_update(a.id).await.unwrap();

    let started = Instant::now();
    let err = tokio::time::timeout(Duration::from_secs(2), coordinator.transfer(input))
        .await
        .expect("transfer should return while the row is still locked")
        .unwrap_err();
    assert!(matches!(err, LedgerError::Timeout(_)));
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(1));

    // The holder still owns the row and sees the untouched balance.
    assert_eq!(holder.get_account(a.id).await.unwrap().balance, 100);
    holder.rollback().await.unwrap();
    assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);

    let result = coordinator.transfer(input).await.unwrap();
    assert_eq!(result.from_account.balance, 90);
    assert_eq!(result.to_account.balance, 110);
}

#[tokio::test]
async fn test_store_bound_cancels_blocked_transfer() {
    let Some(store) = setup().await else { return };
    let store = store.with_timeout(Some(Duration::from_millis(150)));
    let a = create_account(&store, 100).await;
    let b = create_account(&store, 100).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

    let holder = store.begin().await.unwrap();
    holder.get_account_for_update(b.id).await.unwrap();

    let err = tokio::time::timeout(
        Duration::from_secs(2),
        coordinator.transfer(TransferTxInput::new(a.id, b.id, 10)),
    )
    .await
    .expect("server should cancel the blocked statement")
    .unwrap_err();
    assert!(matches!(err, LedgerError::Timeout(d) if d == Duration::from_millis(150)));

    holder.rollback().await.unwrap();
    assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
    assert_eq!(store.get_account(b.id).await.unwrap().balance, 100);
    let transfers = store
        .list_transfers(a.id, b.id, PageRequest::new(10, 0))
        .await
        .unwrap();
    assert!(transfers.is_empty());
}

#[tokio::test]
async fn test_self_transfer_keeps_balance() {
    let Some(store) = setup().await else { return };
    let a = create_account(&store, 100).await;
    let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

    let result = coordinator
        .transfer(TransferTxInput::new(a.id, a.id, 25))
        .await
        .unwrap();
    assert_eq!(result.from_account.balance, 100);
    assert_eq!(result.to_account.balance, 100);
    assert_eq!(result.from_entry.amount, -25);
    assert_eq!(result.to_entry.amount, 25);

    assert_eq!(store.get_account(a.id).await.unwrap().balance, 100);
    let entries = store
        .list_entries(a.id, PageRequest::new(10, 0))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.iter().map(|e| e.amount).sum::<i64>(), 0);
    let transfers = store
        .list_transfers(a.id, a.id, PageRequest::new(10, 0))
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
}
