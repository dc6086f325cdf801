//! Postgres persistence for SimpleBank.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories that run against a pool or an open transaction
//! - [`SqlStore`], the Postgres implementation of the ledger store traits
//! - Database migrations

pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;
pub mod store;

pub use error::db_err;
pub use repositories::{AccountRepository, EntryRepository, TransferRepository};
pub use store::{SqlStore, SqlTx};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use simplebank_shared::DatabaseConfig;
use tracing::info;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout())
        .acquire_timeout(config.connect_timeout())
        .sqlx_logging(config.sqlx_logging);

    let db = Database::connect(options).await?;
    info!(
        max_connections = config.max_connections,
        "Database connection established"
    );
    Ok(db)
}

/// Applies every pending migration.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    migration::Migrator::up(db, None).await
}
