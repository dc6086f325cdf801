//! Ledger records, errors, store capabilities, and lock ordering.
//!
//! - Account, entry, and transfer domain types
//! - The single error type shared by every store
//! - The store capability traits the transfer coordinator depends on
//! - The canonical ordering of balance updates

pub mod error;
pub mod ordering;
pub mod store;
pub mod types;

#[cfg(test)]
mod ordering_props;

pub use error::LedgerError;
pub use ordering::{BalanceUpdate, Side, lock_order, ordered_updates};
pub use store::{LedgerQueries, TransactionalStore, UnitOfWork};
pub use types::{
    Account, CreateAccountInput, CreateEntryInput, CreateTransferInput, Entry, Transfer,
};
