//! Property-based tests for the transfer coordinator.
//!
//! - Money is conserved across any sequence of transfers
//! - Every committed transfer has exactly one debit and one credit entry
//! - Rejected transfers leave no trace

use std::sync::Arc;

use proptest::prelude::*;
use simplebank_shared::types::{AccountId, PageRequest};

use super::{TransferCoordinator, TransferTxInput};
use crate::ledger::{CreateAccountInput, LedgerError, LedgerQueries};
use crate::memory::InMemoryStore;

const ACCOUNTS: usize = 3;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

/// Strategy to generate `(from, to, amount)` over the seeded accounts.
fn transfer_step() -> impl Strategy<Value = (usize, usize, i64)> {
    (0..ACCOUNTS, 0..ACCOUNTS, 1i64..500)
}

async fn seed(store: &InMemoryStore, balances: &[i64]) -> Vec<AccountId> {
    let mut ids = Vec::with_capacity(balances.len());
    for (i, balance) in balances.iter().enumerate() {
        let account = store
            .create_account(CreateAccountInput {
                owner: format!("owner-{i}"),
                balance: *balance,
                currency: "USD".to_string(),
            })
            .await
            .unwrap();
        ids.push(account.id);
    }
    ids
}

async fn total(store: &InMemoryStore, ids: &[AccountId]) -> i64 {
    let mut sum = 0;
    for id in ids {
        sum += store.get_account(*id).await.unwrap().balance;
    }
    sum
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// *For any* sequence of transfers, the sum of all balances is unchanged
    /// and each account's balance moved by exactly the sum of its entries.
    #[test]
    fn prop_transfers_conserve_money(
        balances in prop::collection::vec(0i64..10_000, ACCOUNTS),
        steps in prop::collection::vec(transfer_step(), 1..20),
    ) {
        let rt = runtime();
        let (before, after, drift) = rt.block_on(async {
            let store = InMemoryStore::new();
            let ids = seed(&store, &balances).await;
            let coordinator = TransferCoordinator::new(Arc::new(store.clone()));

            let before = total(&store, &ids).await;
            for (from, to, amount) in &steps {
                coordinator
                    .transfer(TransferTxInput::new(ids[*from], ids[*to], *amount))
                    .await
                    .unwrap();
            }
            let after = total(&store, &ids).await;

            let mut drift = Vec::new();
            for (id, initial) in ids.iter().zip(&balances) {
                let balance = store.get_account(*id).await.unwrap().balance;
                let entries = store
                    .list_entries(*id, PageRequest::new(1_000, 0))
                    .await
                    .unwrap();
                let moved: i64 = entries.iter().map(|e| e.amount).sum();
                drift.push(balance - initial - moved);
            }
            (before, after, drift)
        });

        prop_assert_eq!(before, after);
        prop_assert!(drift.iter().all(|d| *d == 0));
    }

    /// *For any* committed transfer, the entries are `-amount` on `from` and
    /// `+amount` on `to`, and the transfer record carries the request.
    #[test]
    fn prop_entries_mirror_transfer(
        step in transfer_step(),
    ) {
        let (from, to, amount) = step;
        let rt = runtime();
        let result = rt.block_on(async {
            let store = InMemoryStore::new();
            let ids = seed(&store, &[1_000; ACCOUNTS]).await;
            let coordinator = TransferCoordinator::new(Arc::new(store));
            coordinator
                .transfer(TransferTxInput::new(ids[from], ids[to], amount))
                .await
                .unwrap()
        });

        prop_assert_eq!(result.transfer.amount, amount);
        prop_assert_eq!(result.from_entry.amount, -amount);
        prop_assert_eq!(result.to_entry.amount, amount);
        prop_assert_eq!(result.from_entry.account_id, result.transfer.from_account_id);
        prop_assert_eq!(result.to_entry.account_id, result.transfer.to_account_id);
        prop_assert_eq!(result.from_entry.amount + result.to_entry.amount, 0);
    }

    /// *For any* non-positive amount, the transfer is rejected before the
    /// store is touched.
    #[test]
    fn prop_non_positive_amount_touches_nothing(amount in i64::MIN..=0) {
        let rt = runtime();
        let (err, calls) = rt.block_on(async {
            let store = InMemoryStore::new();
            let coordinator = TransferCoordinator::new(Arc::new(store.clone()));
            let err = coordinator
                .transfer(TransferTxInput::new(AccountId::new(1), AccountId::new(2), amount))
                .await
                .unwrap_err();
            (err, store.calls().len())
        });

        prop_assert!(matches!(err, LedgerError::InvalidAmount(a) if a == amount));
        prop_assert_eq!(calls, 0);
    }
}
