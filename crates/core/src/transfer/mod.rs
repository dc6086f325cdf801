//! Atomic money transfers between two accounts.
//!
//! A transfer writes one transfer record, two entries, and two balance
//! updates inside a single unit of work. Balance updates always lock the
//! lower account id first, so transfers in opposite directions between the
//! same pair of accounts cannot deadlock.

pub mod coordinator;
pub mod types;

#[cfg(test)]
mod coordinator_props;

pub use coordinator::TransferCoordinator;
pub use types::{TransferTxInput, TransferTxResult};
