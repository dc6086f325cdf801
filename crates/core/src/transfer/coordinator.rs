//! Transfer coordinator.
//!
//! Wraps transfer creation, both ledger entries, and both balance updates in
//! one unit of work:
//!
//! 1. Reject non-positive amounts before anything is opened
//! 2. Begin a unit of work
//! 3. Create the transfer record
//! 4. Create the `-amount` entry, then the `+amount` entry
//! 5. Apply both balance deltas in canonical lock order
//! 6. Commit, or roll back and report the step error (plus the rollback
//!    error if the rollback also fails)
//!
//! The coordinator takes no in-process locks. Mutual exclusion comes from the
//! row locks the store takes in `add_account_balance`.

use std::sync::Arc;
use std::time::Duration;

use simplebank_shared::TransferConfig;
use tracing::{debug, error, info, warn};

use super::types::{TransferTxInput, TransferTxResult};
use crate::ledger::{
    Account, CreateEntryInput, LedgerError, LedgerQueries, Side, TransactionalStore, UnitOfWork,
    ordered_updates,
};

/// Runs transfers atomically against a transactional store.
///
/// Transfers are not idempotent: calling [`TransferCoordinator::transfer`]
/// twice with the same input moves the funds twice. Deduplication belongs to
/// the caller.
#[derive(Debug)]
pub struct TransferCoordinator<S> {
    store: Arc<S>,
    timeout: Option<Duration>,
}

impl<S> Clone for TransferCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: TransactionalStore> TransferCoordinator<S> {
    /// Create a coordinator over `store` with no time bound.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Create a coordinator using the configured time bound.
    #[must_use]
    pub fn from_config(store: Arc<S>, config: &TransferConfig) -> Self {
        Self::new(store).with_timeout(config.timeout())
    }

    /// Bound each unit of work. On expiry the work is aborted and
    /// [`LedgerError::Timeout`] is returned.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Move `input.amount` from one account to the other.
    ///
    /// Either all five writes commit together or none of them is visible.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if the amount is not positive; no unit
    ///   of work is opened
    /// - the failing step's error, verbatim, after a successful rollback
    /// - [`LedgerError::RollbackFailed`] if the rollback failed as well
    /// - the commit error if the commit itself fails
    #[tracing::instrument(
        name = "transfer_tx",
        skip(self, input),
        fields(
            from = %input.from_account_id,
            to = %input.to_account_id,
            amount = input.amount,
        )
    )]
    pub async fn transfer(&self, input: TransferTxInput) -> Result<TransferTxResult, LedgerError> {
        input.validate()?;

        let tx = self.store.begin().await?;

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, execute(&tx, input))
                .await
                .unwrap_or_else(|_| Err(LedgerError::Timeout(limit))),
            None => execute(&tx, input).await,
        };

        match outcome {
            Ok(result) => {
                tx.commit().await?;
                info!(
                    transfer_id = %result.transfer.id,
                    from_balance = result.from_account.balance,
                    to_balance = result.to_account.balance,
                    "Transfer committed"
                );
                Ok(result)
            }
            Err(err) => Err(abort(tx, err).await),
        }
    }
}

/// The five writes of a transfer, against an open unit of work.
async fn execute<Q: LedgerQueries>(
    q: &Q,
    input: TransferTxInput,
) -> Result<TransferTxResult, LedgerError> {
    let transfer = q.create_transfer(input.into()).await?;

    let from_entry = q
        .create_entry(CreateEntryInput {
            account_id: input.from_account_id,
            amount: -input.amount,
        })
        .await?;

    let to_entry = q
        .create_entry(CreateEntryInput {
            account_id: input.to_account_id,
            amount: input.amount,
        })
        .await?;

    let (from_account, to_account) = apply_balances(q, input).await?;

    Ok(TransferTxResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

/// Applies both deltas lowest account id first and returns
/// `(from_account, to_account)`.
async fn apply_balances<Q: LedgerQueries>(
    q: &Q,
    input: TransferTxInput,
) -> Result<(Account, Account), LedgerError> {
    let [first, second] = ordered_updates(input.from_account_id, input.to_account_id, input.amount);

    let first_account = q.add_account_balance(first.account_id, first.delta).await?;
    debug!(account_id = %first.account_id, delta = first.delta, "Balance updated");

    let second_account = q.add_account_balance(second.account_id, second.delta).await?;
    debug!(account_id = %second.account_id, delta = second.delta, "Balance updated");

    // Self-transfer: only the second snapshot is the committed state.
    if first.account_id == second.account_id {
        return Ok((second_account.clone(), second_account));
    }

    Ok(match first.side {
        Side::From => (first_account, second_account),
        Side::To => (second_account, first_account),
    })
}

/// Rolls back and returns the error the caller should see.
async fn abort<T: UnitOfWork>(tx: T, err: LedgerError) -> LedgerError {
    match tx.rollback().await {
        Ok(()) => {
            warn!(error = %err, "Transfer rolled back");
            err
        }
        Err(rollback) => {
            error!(error = %err, rollback_error = %rollback, "Transfer rollback failed");
            LedgerError::rollback_failed(err, rollback)
        }
    }
}
