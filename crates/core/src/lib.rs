//! Core transfer logic for SimpleBank.
//!
//! This crate holds the domain types, the store capability traits, and the
//! transfer coordinator. It has no database or web dependencies; the SQL
//! store lives in `simplebank-db`.
//!
//! # Modules
//!
//! - `ledger` - Accounts, entries, transfers, and the store traits
//! - `transfer` - The atomic two-account transfer coordinator
//! - `currency` - Supported currencies and currency checks
//! - `memory` - In-memory store with real row locks, for tests and demos

pub mod currency;
pub mod ledger;
pub mod memory;
pub mod transfer;

pub use ledger::{
    Account, CreateAccountInput, CreateEntryInput, CreateTransferInput, Entry, LedgerError,
    LedgerQueries, TransactionalStore, Transfer, UnitOfWork,
};
pub use memory::InMemoryStore;
pub use transfer::{TransferCoordinator, TransferTxInput, TransferTxResult};
