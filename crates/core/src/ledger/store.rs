//! Store capability traits.
//!
//! These traits are implemented by the db crate (PostgreSQL via SeaORM) and by
//! [`crate::memory::InMemoryStore`]. The transfer coordinator depends only on
//! them.
//!
//! A [`TransactionalStore`] is the pool-level handle: its own
//! [`LedgerQueries`] methods run in autocommit mode, and [`TransactionalStore::begin`]
//! opens a [`UnitOfWork`] whose queries see its own writes and hold row locks
//! until [`UnitOfWork::commit`] or [`UnitOfWork::rollback`]. Dropping a unit of
//! work without committing rolls it back.

use std::future::Future;

use simplebank_shared::types::{AccountId, EntryId, PageRequest, TransferId};

use super::error::LedgerError;
use super::types::{
    Account, CreateAccountInput, CreateEntryInput, CreateTransferInput, Entry, Transfer,
};

/// Single-row operations on accounts, entries, and transfers.
pub trait LedgerQueries: Send + Sync {
    /// Create a new account.
    fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> impl Future<Output = Result<Account, LedgerError>> + Send;

    /// Find an account by ID.
    fn get_account(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Account, LedgerError>> + Send;

    /// Find an account by ID and hold its row lock for the rest of the unit of work.
    fn get_account_for_update(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Account, LedgerError>> + Send;

    /// Overwrite an account's balance. Administrative path only.
    fn update_account(
        &self,
        id: AccountId,
        balance: i64,
    ) -> impl Future<Output = Result<Account, LedgerError>> + Send;

    /// Delete an account.
    fn delete_account(&self, id: AccountId)
    -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// List accounts in ascending ID order.
    fn list_accounts(
        &self,
        page: PageRequest,
    ) -> impl Future<Output = Result<Vec<Account>, LedgerError>> + Send;

    /// Balance mutator: add `amount` to the stored balance and return the row.
    ///
    /// Takes the account's exclusive row lock, held until the enclosing unit
    /// of work ends, so concurrent mutators of one account serialize.
    fn add_account_balance(
        &self,
        id: AccountId,
        amount: i64,
    ) -> impl Future<Output = Result<Account, LedgerError>> + Send;

    /// Append a ledger entry.
    fn create_entry(
        &self,
        input: CreateEntryInput,
    ) -> impl Future<Output = Result<Entry, LedgerError>> + Send;

    /// Find an entry by ID.
    fn get_entry(&self, id: EntryId) -> impl Future<Output = Result<Entry, LedgerError>> + Send;

    /// List an account's entries in ascending ID order.
    fn list_entries(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> impl Future<Output = Result<Vec<Entry>, LedgerError>> + Send;

    /// Record a transfer.
    fn create_transfer(
        &self,
        input: CreateTransferInput,
    ) -> impl Future<Output = Result<Transfer, LedgerError>> + Send;

    /// Find a transfer by ID.
    fn get_transfer(
        &self,
        id: TransferId,
    ) -> impl Future<Output = Result<Transfer, LedgerError>> + Send;

    /// List transfers sent from `from_account_id` or received by
    /// `to_account_id`, in ascending ID order.
    fn list_transfers(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: PageRequest,
    ) -> impl Future<Output = Result<Vec<Transfer>, LedgerError>> + Send;
}

/// An open, atomic, isolated group of writes.
pub trait UnitOfWork: LedgerQueries + Sized {
    /// Make every write durable and visible, then release all row locks.
    fn commit(self) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Discard every write, then release all row locks.
    fn rollback(self) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// A store that can open units of work.
pub trait TransactionalStore: LedgerQueries {
    /// The unit-of-work handle.
    type Tx: UnitOfWork;

    /// Open a unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, LedgerError>> + Send;
}
