//! Shared types and configuration for SimpleBank.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for accounts, entries, and transfers
//! - Limit/offset pagination for list queries
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LogConfig, TransferConfig};
pub use types::{AccountId, EntryId, PageRequest, TransferId};
