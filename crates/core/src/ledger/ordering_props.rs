//! Property-based tests for the canonical lock ordering.
//!
//! - Ordering is independent of transfer direction
//! - Updates are always issued lowest id first
//! - Deltas keep their side and cancel out

use proptest::prelude::*;
use simplebank_shared::types::AccountId;

use super::ordering::{Side, lock_order, ordered_updates};

/// Strategy to generate account ids as a database sequence would.
fn account_id() -> impl Strategy<Value = AccountId> {
    (1i64..10_000i64).prop_map(AccountId::new)
}

/// Strategy to generate positive transfer amounts.
fn positive_amount() -> impl Strategy<Value = i64> {
    1i64..1_000_000i64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* pair of ids, both argument orders produce the same pair.
    #[test]
    fn prop_lock_order_symmetric(a in account_id(), b in account_id()) {
        prop_assert_eq!(lock_order(a, b), lock_order(b, a));
    }

    /// *For any* pair of ids, the first element is never greater than the second.
    #[test]
    fn prop_lock_order_ascending(a in account_id(), b in account_id()) {
        let (low, high) = lock_order(a, b);
        prop_assert!(low <= high);
        prop_assert!(low == a || low == b);
        prop_assert!(high == a || high == b);
    }

    /// *For any* transfer, a transfer in the opposite direction locks the same
    /// account first.
    #[test]
    fn prop_reverse_transfer_locks_same_account_first(
        a in account_id(),
        b in account_id(),
        amount in positive_amount(),
    ) {
        let [forward, _] = ordered_updates(a, b, amount);
        let [backward, _] = ordered_updates(b, a, amount);
        prop_assert_eq!(forward.account_id, backward.account_id);
        prop_assert_eq!(forward.account_id, lock_order(a, b).0);
    }

    /// *For any* transfer, the debit stays on `from`, the credit stays on `to`,
    /// and the two deltas sum to zero.
    #[test]
    fn prop_updates_preserve_sides(
        from in account_id(),
        to in account_id(),
        amount in positive_amount(),
    ) {
        let updates = ordered_updates(from, to, amount);
        let debit = updates.iter().find(|u| u.side == Side::From).unwrap();
        let credit = updates.iter().find(|u| u.side == Side::To).unwrap();

        prop_assert_eq!(debit.account_id, from);
        prop_assert_eq!(debit.delta, -amount);
        prop_assert_eq!(credit.account_id, to);
        prop_assert_eq!(credit.delta, amount);
        prop_assert_eq!(updates[0].delta + updates[1].delta, 0);
    }
}
