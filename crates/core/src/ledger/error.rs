//! Ledger error types.
//!
//! One error type flows from every store implementation through the transfer
//! coordinator to the caller. Store-specific errors are classified into these
//! variants at the store boundary; the coordinator never rewrites them.

use std::time::Duration;

use simplebank_shared::types::{AccountId, EntryId, TransferId};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    // ========== Not Found ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Entry not found.
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Transfer not found.
    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    // ========== Constraint Violations ==========
    /// Transfer amount must be strictly positive.
    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// Account currency does not match the requested currency.
    #[error("Account {account_id} has currency {actual}, but {expected} was requested")]
    CurrencyMismatch {
        /// Account that was checked.
        account_id: AccountId,
        /// Requested currency code.
        expected: String,
        /// Account's currency code.
        actual: String,
    },

    /// The store rejected a write (foreign key, check, or unique constraint).
    #[error("Constraint violation: {0}")]
    Constraint(String),

    // ========== Store Availability ==========
    /// The store could not be reached or no connection was available.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The unit of work exceeded its time bound and was aborted.
    #[error("Unit of work timed out after {0:?}")]
    Timeout(Duration),

    /// Any other store error.
    #[error("Database error: {0}")]
    Database(String),

    // ========== Abort Failures ==========
    /// A step failed and the rollback that followed failed too.
    #[error("tx error: {source}, rollback error: {rollback}")]
    RollbackFailed {
        /// The error that triggered the rollback.
        source: Box<LedgerError>,
        /// The error returned by the rollback itself.
        rollback: Box<LedgerError>,
    },
}

impl LedgerError {
    /// Wraps a step failure together with the rollback failure that followed.
    #[must_use]
    pub fn rollback_failed(source: Self, rollback: Self) -> Self {
        Self::RollbackFailed {
            source: Box::new(source),
            rollback: Box::new(rollback),
        }
    }

    /// Returns true if a referenced record is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_) | Self::EntryNotFound(_) | Self::TransferNotFound(_)
        )
    }

    /// Returns true if the failure is transient and the caller may retry.
    ///
    /// Transfers are not idempotent: a retry after a timeout may duplicate a
    /// transfer whose commit did reach the store.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Returns the stable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) | Self::EntryNotFound(_) | Self::TransferNotFound(_) => {
                "NOT_FOUND"
            }
            Self::InvalidAmount(_) | Self::CurrencyMismatch { .. } | Self::Constraint(_) => {
                "CONSTRAINT_VIOLATION"
            }
            Self::Unavailable(_) | Self::Timeout(_) => "STORE_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::RollbackFailed { .. } => "ABORT_FAILURE",
        }
    }
}
