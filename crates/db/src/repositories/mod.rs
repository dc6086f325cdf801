//! Repository abstractions for data access.
//!
//! Repositories borrow any `SeaORM` connection, so the same queries run
//! against the pool or inside an open transaction.

pub mod account;
pub mod entry;
pub mod transfer;

pub use account::AccountRepository;
pub use entry::EntryRepository;
pub use transfer::TransferRepository;
