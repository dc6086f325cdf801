//! Canonical lock ordering for balance updates.
//!
//! Every transfer touching accounts `a` and `b` mutates the lower id first,
//! whatever its direction. Two transfers sharing an account therefore request
//! that account's row lock in the same relative order, and neither can hold a
//! lock the other is waiting on.

use serde::{Deserialize, Serialize};
use simplebank_shared::types::AccountId;

/// Which side of a transfer a balance update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The debited account.
    From,
    /// The credited account.
    To,
}

/// One balance delta of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    /// Side of the transfer this update belongs to.
    pub side: Side,
    /// Account to mutate.
    pub account_id: AccountId,
    /// Signed delta.
    pub delta: i64,
}

/// Returns the pair in ascending order, independent of argument order.
#[must_use]
pub fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Returns the two balance updates of a transfer in execution order.
///
/// The debit is always `-amount` on `from` and the credit `+amount` on `to`;
/// only their sequence depends on the ids. A self-transfer yields the credit
/// first.
#[must_use]
pub fn ordered_updates(from: AccountId, to: AccountId, amount: i64) -> [BalanceUpdate; 2] {
    let debit = BalanceUpdate {
        side: Side::From,
        account_id: from,
        delta: -amount,
    };
    let credit = BalanceUpdate {
        side: Side::To,
        account_id: to,
        delta: amount,
    };

    if from < to {
        [debit, credit]
    } else {
        [credit, debit]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_source_debits_first() {
        let [first, second] = ordered_updates(AccountId::new(1), AccountId::new(2), 30);
        assert_eq!(first.side, Side::From);
        assert_eq!(first.account_id, AccountId::new(1));
        assert_eq!(first.delta, -30);
        assert_eq!(second.side, Side::To);
        assert_eq!(second.delta, 30);
    }

    #[test]
    fn test_lower_destination_credits_first() {
        let [first, second] = ordered_updates(AccountId::new(9), AccountId::new(4), 30);
        assert_eq!(first.side, Side::To);
        assert_eq!(first.account_id, AccountId::new(4));
        assert_eq!(first.delta, 30);
        assert_eq!(second.side, Side::From);
        assert_eq!(second.account_id, AccountId::new(9));
        assert_eq!(second.delta, -30);
    }

    #[test]
    fn test_self_transfer_targets_one_account() {
        let id = AccountId::new(5);
        let [first, second] = ordered_updates(id, id, 10);
        assert_eq!(first.account_id, id);
        assert_eq!(second.account_id, id);
        assert_eq!(first.delta + second.delta, 0);
    }

    #[test]
    fn test_lock_order_is_direction_independent() {
        let a = AccountId::new(17);
        let b = AccountId::new(3);
        assert_eq!(lock_order(a, b), (b, a));
        assert_eq!(lock_order(b, a), (b, a));
    }
}
