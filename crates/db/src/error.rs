//! Mapping from `SeaORM` errors to ledger errors.

use std::time::Duration;

use sea_orm::{DbErr, SqlErr};
use simplebank_core::ledger::LedgerError;

/// Postgres messages for rejected values that are not reported as
/// [`SqlErr`] variants.
const CONSTRAINT_MESSAGES: [&str; 2] = ["violates check constraint", "out of range"];

/// Postgres messages for statements cancelled by `lock_timeout` (55P03) or
/// `statement_timeout` (57014).
const TIMEOUT_MESSAGES: [&str; 2] = [
    "canceling statement due to lock timeout",
    "canceling statement due to statement timeout",
];

/// Classifies a database error outside a bounded transaction.
pub fn db_err(err: DbErr) -> LedgerError {
    classify(err, None)
}

/// Classifies a database error.
///
/// - Lost or unobtainable connections become [`LedgerError::Unavailable`]
/// - Statements cancelled by a server-side timeout become
///   [`LedgerError::Timeout`] carrying `bound`, or
///   [`LedgerError::Unavailable`] when no bound was set by this store
/// - Unique, foreign-key, and check violations become [`LedgerError::Constraint`]
/// - Everything else becomes [`LedgerError::Database`]
pub fn classify(err: DbErr, bound: Option<Duration>) -> LedgerError {
    if let Some(SqlErr::UniqueConstraintViolation(msg) | SqlErr::ForeignKeyConstraintViolation(msg)) =
        err.sql_err()
    {
        return LedgerError::Constraint(msg);
    }

    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => LedgerError::Unavailable(err.to_string()),
        other => {
            let msg = other.to_string();
            if TIMEOUT_MESSAGES.iter().any(|m| msg.contains(m)) {
                return bound.map_or(LedgerError::Unavailable(msg), LedgerError::Timeout);
            }
            if CONSTRAINT_MESSAGES.iter().any(|m| msg.contains(m)) {
                LedgerError::Constraint(msg)
            } else {
                LedgerError::Database(msg)
            }
        }
    }
}
