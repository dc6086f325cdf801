//! Transfer coordinator input and result types.

use serde::{Deserialize, Serialize};
use simplebank_shared::types::AccountId;

use crate::ledger::{Account, CreateTransferInput, Entry, LedgerError, Transfer};

/// A request to move `amount` from one account to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxInput {
    /// Debited account.
    pub from_account_id: AccountId,
    /// Credited account.
    pub to_account_id: AccountId,
    /// Amount in the smallest currency unit. Must be positive.
    pub amount: i64,
}

impl TransferTxInput {
    /// Creates a transfer request.
    #[must_use]
    pub const fn new(from_account_id: AccountId, to_account_id: AccountId, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Rejects non-positive amounts.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= 0 {
            return Err(LedgerError::InvalidAmount(self.amount));
        }
        Ok(())
    }
}

impl From<TransferTxInput> for CreateTransferInput {
    fn from(input: TransferTxInput) -> Self {
        Self {
            from_account_id: input.from_account_id,
            to_account_id: input.to_account_id,
            amount: input.amount,
        }
    }
}

/// Everything one committed transfer wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxResult {
    /// The transfer record.
    pub transfer: Transfer,
    /// Debited account after the update.
    pub from_account: Account,
    /// Credited account after the update.
    pub to_account: Account,
    /// Entry of `-amount` on the debited account.
    pub from_entry: Entry,
    /// Entry of `+amount` on the credited account.
    pub to_entry: Entry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::MIN)]
    fn test_validate_rejects_non_positive(#[case] amount: i64) {
        let input = TransferTxInput::new(AccountId::new(1), AccountId::new(2), amount);
        assert!(matches!(
            input.validate(),
            Err(LedgerError::InvalidAmount(a)) if a == amount
        ));
    }

    #[test]
    fn test_validate_accepts_positive() {
        let input = TransferTxInput::new(AccountId::new(1), AccountId::new(2), 1);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_deserialize_request() {
        let input: TransferTxInput = serde_json::from_str(
            r#"{"from_account_id": 3, "to_account_id": 8, "amount": 250}"#,
        )
        .unwrap();
        assert_eq!(
            input,
            TransferTxInput::new(AccountId::new(3), AccountId::new(8), 250)
        );
    }
}
