//! Ledger domain types.
//!
//! Accounts carry the materialized balance; entries and transfers are the
//! append-only journal that explains it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simplebank_shared::types::{AccountId, EntryId, TransferId};

/// A ledger account.
///
/// `balance` is in the smallest currency unit and only moves through
/// `add_account_balance` inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owner reference.
    pub owner: String,
    /// Current balance.
    pub balance: i64,
    /// ISO currency code.
    pub currency: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One signed, immutable movement of funds against a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry ID.
    pub id: EntryId,
    /// Account the movement applies to.
    pub account_id: AccountId,
    /// Signed amount; negative for the debited side.
    pub amount: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// The record linking a pair of entries as one funds movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Transfer ID.
    pub id: TransferId,
    /// Debited account.
    pub from_account_id: AccountId,
    /// Credited account.
    pub to_account_id: AccountId,
    /// Positive amount moved.
    pub amount: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountInput {
    /// Owner reference.
    pub owner: String,
    /// Opening balance.
    pub balance: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Input for creating a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntryInput {
    /// Account the movement applies to.
    pub account_id: AccountId,
    /// Signed amount.
    pub amount: i64,
}

/// Input for creating a transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransferInput {
    /// Debited account.
    pub from_account_id: AccountId,
    /// Credited account.
    pub to_account_id: AccountId,
    /// Positive amount.
    pub amount: i64,
}
