//! Postgres-backed ledger store.
//!
//! [`SqlStore`] runs each call in its own implicit transaction.
//! [`SqlTx`] runs calls inside one explicit transaction, where
//! `get_account_for_update` and the balance writes take row locks held
//! until commit or rollback.
//!
//! A store built with [`SqlStore::with_timeout`] sets `lock_timeout` and
//! `statement_timeout` on every transaction it begins, so a statement stuck
//! behind another transaction's row lock is cancelled by the server.

use std::time::Duration;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait,
};
use simplebank_core::ledger::{
    Account, CreateAccountInput, CreateEntryInput, CreateTransferInput, Entry, LedgerError,
    LedgerQueries, TransactionalStore, Transfer, UnitOfWork,
};
use simplebank_shared::types::{AccountId, EntryId, PageRequest, TransferId};
use tracing::instrument;

use crate::error::{classify, db_err};
use crate::repositories::{AccountRepository, EntryRepository, TransferRepository};

/// Ledger store over a connection pool.
#[derive(Debug, Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
    timeout: Option<Duration>,
}

impl SqlStore {
    /// Wraps an established connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db, timeout: None }
    }

    /// Bounds how long any statement of a transaction from [`begin`] may
    /// wait or run before the server cancels it.
    ///
    /// [`begin`]: TransactionalStore::begin
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Statement bound applied to transactions.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    const fn conn(&self) -> Conn<'_, DatabaseConnection> {
        Conn { db: &self.db, bound: None }
    }

    /// Underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// One open database transaction.
///
/// Dropping it without committing rolls back.
#[derive(Debug)]
pub struct SqlTx {
    tx: DatabaseTransaction,
    bound: Option<Duration>,
}

impl SqlTx {
    const fn conn(&self) -> Conn<'_, DatabaseTransaction> {
        Conn { db: &self.tx, bound: self.bound }
    }
}

/// A connection together with the statement bound its errors report.
struct Conn<'a, C> {
    db: &'a C,
    bound: Option<Duration>,
}

impl<C> Conn<'_, C> {
    fn err(&self, err: DbErr) -> LedgerError {
        classify(err, self.bound)
    }
}

async fn create_account<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    input: CreateAccountInput,
) -> Result<Account, LedgerError> {
    AccountRepository::new(conn.db)
        .create(&input.owner, input.balance, &input.currency)
        .await
        .map(Account::from)
        .map_err(|err| conn.err(err))
}

async fn get_account<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    id: AccountId,
) -> Result<Account, LedgerError> {
    let found = AccountRepository::new(conn.db)
        .find_by_id(id.into_inner())
        .await
        .map_err(|err| conn.err(err))?;
    found.map(Account::from).ok_or(LedgerError::AccountNotFound(id))
}

async fn get_account_for_update<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    id: AccountId,
) -> Result<Account, LedgerError> {
    let found = AccountRepository::new(conn.db)
        .find_by_id_for_update(id.into_inner())
        .await
        .map_err(|err| conn.err(err))?;
    found.map(Account::from).ok_or(LedgerError::AccountNotFound(id))
}

async fn update_account<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    id: AccountId,
    balance: i64,
) -> Result<Account, LedgerError> {
    let updated = AccountRepository::new(conn.db)
        .update_balance(id.into_inner(), balance)
        .await
        .map_err(|err| conn.err(err))?;
    updated.map(Account::from).ok_or(LedgerError::AccountNotFound(id))
}

async fn delete_account<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    id: AccountId,
) -> Result<(), LedgerError> {
    let removed = AccountRepository::new(conn.db)
        .delete(id.into_inner())
        .await
        .map_err(|err| conn.err(err))?;
    if removed == 0 {
        return Err(LedgerError::AccountNotFound(id));
    }
    Ok(())
}

async fn list_accounts<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    page: PageRequest,
) -> Result<Vec<Account>, LedgerError> {
    let models = AccountRepository::new(conn.db)
        .list(page.limit, page.offset)
        .await
        .map_err(|err| conn.err(err))?;
    Ok(models.into_iter().map(Account::from).collect())
}

async fn add_account_balance<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    id: AccountId,
    amount: i64,
) -> Result<Account, LedgerError> {
    let updated = AccountRepository::new(conn.db)
        .add_balance(id.into_inner(), amount)
        .await
        .map_err(|err| conn.err(err))?;
    updated.map(Account::from).ok_or(LedgerError::AccountNotFound(id))
}

async fn create_entry<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    input: CreateEntryInput,
) -> Result<Entry, LedgerError> {
    EntryRepository::new(conn.db)
        .create(input.account_id.into_inner(), input.amount)
        .await
        .map(Entry::from)
        .map_err(|err| conn.err(err))
}

async fn get_entry<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    id: EntryId,
) -> Result<Entry, LedgerError> {
    let found = EntryRepository::new(conn.db)
        .find_by_id(id.into_inner())
        .await
        .map_err(|err| conn.err(err))?;
    found.map(Entry::from).ok_or(LedgerError::EntryNotFound(id))
}

async fn list_entries<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    account_id: AccountId,
    page: PageRequest,
) -> Result<Vec<Entry>, LedgerError> {
    let models = EntryRepository::new(conn.db)
        .list_by_account(account_id.into_inner(), page.limit, page.offset)
        .await
        .map_err(|err| conn.err(err))?;
    Ok(models.into_iter().map(Entry::from).collect())
}

async fn create_transfer<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    input: CreateTransferInput,
) -> Result<Transfer, LedgerError> {
    TransferRepository::new(conn.db)
        .create(
            input.from_account_id.into_inner(),
            input.to_account_id.into_inner(),
            input.amount,
        )
        .await
        .map(Transfer::from)
        .map_err(|err| conn.err(err))
}

async fn get_transfer<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    id: TransferId,
) -> Result<Transfer, LedgerError> {
    let found = TransferRepository::new(conn.db)
        .find_by_id(id.into_inner())
        .await
        .map_err(|err| conn.err(err))?;
    found.map(Transfer::from).ok_or(LedgerError::TransferNotFound(id))
}

async fn list_transfers<C: ConnectionTrait>(
    conn: Conn<'_, C>,
    from_account_id: AccountId,
    to_account_id: AccountId,
    page: PageRequest,
) -> Result<Vec<Transfer>, LedgerError> {
    let models = TransferRepository::new(conn.db)
        .list(
            from_account_id.into_inner(),
            to_account_id.into_inner(),
            page.limit,
            page.offset,
        )
        .await
        .map_err(|err| conn.err(err))?;
    Ok(models.into_iter().map(Transfer::from).collect())
}

/// Implements [`LedgerQueries`] for a store type by delegating every call to
/// the free functions above with the store's [`Conn`].
macro_rules! impl_ledger_queries {
    ($store:ty) => {
        impl LedgerQueries for $store {
            #[instrument(skip(self, input), fields(owner = %input.owner), err)]
            async fn create_account(
                &self,
                input: CreateAccountInput,
            ) -> Result<Account, LedgerError> {
                create_account(self.conn(), input).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
                get_account(self.conn(), id).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn get_account_for_update(&self, id: AccountId) -> Result<Account, LedgerError> {
                get_account_for_update(self.conn(), id).await
            }

            #[instrument(skip(self), err)]
            async fn update_account(
                &self,
                id: AccountId,
                balance: i64,
            ) -> Result<Account, LedgerError> {
                update_account(self.conn(), id, balance).await
            }

            #[instrument(skip(self), err)]
            async fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
                delete_account(self.conn(), id).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn list_accounts(&self, page: PageRequest) -> Result<Vec<Account>, LedgerError> {
                list_accounts(self.conn(), page).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn add_account_balance(
                &self,
                id: AccountId,
                amount: i64,
            ) -> Result<Account, LedgerError> {
                add_account_balance(self.conn(), id, amount).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn create_entry(&self, input: CreateEntryInput) -> Result<Entry, LedgerError> {
                create_entry(self.conn(), input).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
                get_entry(self.conn(), id).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn list_entries(
                &self,
                account_id: AccountId,
                page: PageRequest,
            ) -> Result<Vec<Entry>, LedgerError> {
                list_entries(self.conn(), account_id, page).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn create_transfer(
                &self,
                input: CreateTransferInput,
            ) -> Result<Transfer, LedgerError> {
                create_transfer(self.conn(), input).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
                get_transfer(self.conn(), id).await
            }

            #[instrument(skip(self), level = "debug", err)]
            async fn list_transfers(
                &self,
                from_account_id: AccountId,
                to_account_id: AccountId,
                page: PageRequest,
            ) -> Result<Vec<Transfer>, LedgerError> {
                list_transfers(self.conn(), from_account_id, to_account_id, page).await
            }
        }
    };
}

impl_ledger_queries!(SqlStore);
impl_ledger_queries!(SqlTx);

impl TransactionalStore for SqlStore {
    type Tx = SqlTx;

    async fn begin(&self) -> Result<SqlTx, LedgerError> {
        let tx = self.db.begin().await.map_err(db_err)?;
        if let Some(limit) = self.timeout {
            let ms = limit.as_millis().max(1);
            tx.execute_unprepared(&format!(
                "SET LOCAL lock_timeout = {ms}; SET LOCAL statement_timeout = {ms}"
            ))
            .await
            .map_err(db_err)?;
        }
        Ok(SqlTx { tx, bound: self.timeout })
    }
}

impl UnitOfWork for SqlTx {
    async fn commit(self) -> Result<(), LedgerError> {
        let bound = self.bound;
        self.tx.commit().await.map_err(|err| classify(err, bound))
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.tx.rollback().await.map_err(db_err)
    }
}
