//! Deterministic in-memory ledger store.
//!
//! Implements the store traits with the semantics the coordinator relies on:
//!
//! - Per-account row locks, held by a unit of work until it commits, rolls
//!   back, or is dropped. Writers serialize on an update lock. Foreign-key
//!   checks share a key lock that `get_account_for_update` and deletes take
//!   exclusively, so a referenced account cannot vanish mid-insert.
//! - Writes staged per unit of work and invisible to everyone else until commit
//! - Sequence-style id allocation (ids consumed by rolled-back work are not reused)
//! - Foreign-key checks on entry and transfer creation, and on account deletion
//!
//! Every operation is appended to a call log, and faults can be queued per
//! operation to exercise abort paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use simplebank_shared::types::{AccountId, EntryId, PageRequest, TransferId};
use tokio::sync::{OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::ledger::{
    Account, CreateAccountInput, CreateEntryInput, CreateTransferInput, Entry, LedgerError,
    LedgerQueries, TransactionalStore, Transfer, UnitOfWork,
};

/// Store operations, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Unit of work opened.
    Begin,
    /// Unit of work committed.
    Commit,
    /// Unit of work rolled back.
    Rollback,
    /// `create_account`.
    CreateAccount,
    /// `get_account`.
    GetAccount,
    /// `get_account_for_update`.
    GetAccountForUpdate,
    /// `update_account`.
    UpdateAccount,
    /// `delete_account`.
    DeleteAccount,
    /// `list_accounts`.
    ListAccounts,
    /// `add_account_balance`.
    AddAccountBalance,
    /// `create_entry`.
    CreateEntry,
    /// `get_entry`.
    GetEntry,
    /// `list_entries`.
    ListEntries,
    /// `create_transfer`.
    CreateTransfer,
    /// `get_transfer`.
    GetTransfer,
    /// `list_transfers`.
    ListTransfers,
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Unit of work the call ran in. Autocommit calls get their own unit.
    pub unit: u64,
    /// Operation invoked.
    pub operation: Operation,
    /// Account the call targeted, when it targets exactly one.
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
}

impl Tables {
    fn account_referenced(&self, id: AccountId) -> bool {
        self.entries.values().any(|e| e.account_id == id)
            || self
                .transfers
                .values()
                .any(|t| t.from_account_id == id || t.to_account_id == id)
    }
}

/// Locks guarding one account row.
#[derive(Debug, Clone, Default)]
struct RowLock {
    /// Taken by every writer of the row.
    update: Arc<tokio::sync::Mutex<()>>,
    /// Shared by foreign-key checks; exclusive for `FOR UPDATE` and deletes.
    key: Arc<RwLock<()>>,
}

#[derive(Debug)]
enum KeyGuard {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

#[derive(Debug)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<AccountId, RowLock>>,
    calls: Mutex<Vec<Call>>,
    faults: Mutex<Vec<(Operation, LedgerError)>>,
    next_unit: AtomicU64,
    next_account: AtomicI64,
    next_entry: AtomicI64,
    next_transfer: AtomicI64,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            tables: Mutex::default(),
            row_locks: Mutex::default(),
            calls: Mutex::default(),
            faults: Mutex::default(),
            next_unit: AtomicU64::new(1),
            next_account: AtomicI64::new(1),
            next_entry: AtomicI64::new(1),
            next_transfer: AtomicI64::new(1),
        }
    }
}

/// Poisoning only means another test thread panicked; the data is still usable.
fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Records the call and returns the first queued fault for it, if any.
    fn enter(
        &self,
        unit: u64,
        operation: Operation,
        account_id: Option<AccountId>,
    ) -> Result<(), LedgerError> {
        guard(&self.calls).push(Call {
            unit,
            operation,
            account_id,
        });

        let mut faults = guard(&self.faults);
        match faults.iter().position(|(op, _)| *op == operation) {
            Some(index) => Err(faults.remove(index).1),
            None => Ok(()),
        }
    }

    fn row_lock(&self, id: AccountId) -> RowLock {
        guard(&self.row_locks).entry(id).or_default().clone()
    }

    /// Drops the lock entry of a deleted account. Units still waiting on it
    /// keep their handles and find the row gone once they acquire.
    fn forget_row(&self, id: AccountId) {
        guard(&self.row_locks).remove(&id);
    }
}

/// In-memory ledger store.
///
/// Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        guard(&self.shared.calls).clone()
    }

    /// Clears the call log.
    pub fn clear_calls(&self) {
        guard(&self.shared.calls).clear();
    }

    /// Makes the next call to `operation` fail with `error`.
    ///
    /// Faults queue: injecting twice for one operation fails its next two calls.
    pub fn inject_fault(&self, operation: Operation, error: LedgerError) {
        guard(&self.shared.faults).push((operation, error));
    }

    fn open(&self) -> MemoryTx {
        MemoryTx {
            shared: Arc::clone(&self.shared),
            unit: self.shared.next_unit.fetch_add(1, Ordering::Relaxed),
            staged: Mutex::default(),
        }
    }
}

/// Writes and row locks held by one unit of work.
#[derive(Debug, Default)]
struct Staged {
    /// `None` marks a deleted account.
    accounts: BTreeMap<AccountId, Option<Account>>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
    locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    key_locks: HashMap<AccountId, KeyGuard>,
}

/// A unit of work over an [`InMemoryStore`].
///
/// Dropping it without committing discards its writes and releases its locks.
#[derive(Debug)]
pub struct MemoryTx {
    shared: Arc<Shared>,
    unit: u64,
    staged: Mutex<Staged>,
}

impl MemoryTx {
    fn enter(&self, operation: Operation, account_id: Option<AccountId>) -> Result<(), LedgerError> {
        self.shared.enter(self.unit, operation, account_id)
    }

    /// Blocks until this unit of work holds the update lock for `id`.
    /// Re-entrant. Missing accounts are not locked.
    async fn lock_row(&self, id: AccountId) {
        if self.read_account(id).is_none() || guard(&self.staged).locks.contains_key(&id) {
            return;
        }

        let row = self.shared.row_lock(id).update;
        let held = row.lock_owned().await;
        guard(&self.staged).locks.insert(id, held);
    }

    /// Blocks until this unit of work shares the key lock for `id`.
    async fn lock_key_shared(&self, id: AccountId) {
        if self.read_account(id).is_none() || guard(&self.staged).key_locks.contains_key(&id) {
            return;
        }

        let key = self.shared.row_lock(id).key;
        let held = key.read_owned().await;
        guard(&self.staged).key_locks.insert(id, KeyGuard::Shared(held));
    }

    /// Takes the key lock exclusively, then the update lock. No lock on `id`
    /// is held while waiting for the key lock.
    async fn lock_row_exclusive(&self, id: AccountId) {
        if self.read_account(id).is_none() {
            return;
        }

        let held = guard(&self.staged).key_locks.remove(&id);
        let held = match held {
            Some(KeyGuard::Exclusive(held)) => held,
            other => {
                // Upgrade: release a shared hold before waiting for exclusivity.
                drop(other);
                let key = self.shared.row_lock(id).key;
                key.write_owned().await
            }
        };
        guard(&self.staged)
            .key_locks
            .insert(id, KeyGuard::Exclusive(held));

        self.lock_row(id).await;
    }

    /// The account as this unit of work sees it.
    fn read_account(&self, id: AccountId) -> Option<Account> {
        if let Some(staged) = guard(&self.staged).accounts.get(&id) {
            return staged.clone();
        }
        guard(&self.shared.tables).accounts.get(&id).cloned()
    }

    fn require_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.read_account(id).ok_or(LedgerError::AccountNotFound(id))
    }

    fn stage_account(&self, account: Account) {
        guard(&self.staged).accounts.insert(account.id, Some(account));
    }

    /// Checks that `id` exists and keeps it from being deleted until this
    /// unit of work ends.
    async fn foreign_key(&self, constraint: &str, id: AccountId) -> Result<(), LedgerError> {
        self.lock_key_shared(id).await;
        if self.read_account(id).is_none() {
            return Err(LedgerError::Constraint(format!(
                "{constraint}: account {id} does not exist"
            )));
        }
        Ok(())
    }

    /// Applies the staged writes, then releases the row locks.
    fn apply(&self) {
        let Staged {
            accounts,
            entries,
            transfers,
            locks,
            key_locks,
        } = std::mem::take(&mut *guard(&self.staged));

        let mut deleted = Vec::new();
        let mut tables = guard(&self.shared.tables);
        for (id, account) in accounts {
            match account {
                Some(account) => {
                    tables.accounts.insert(id, account);
                }
                None => {
                    tables.accounts.remove(&id);
                    deleted.push(id);
                }
            }
        }
        tables.entries.extend(entries);
        tables.transfers.extend(transfers);
        drop(tables);

        for id in deleted {
            self.shared.forget_row(id);
        }
        drop(key_locks);
        drop(locks);
    }
}

impl LedgerQueries for MemoryTx {
    async fn create_account(&self, input: CreateAccountInput) -> Result<Account, LedgerError> {
        self.enter(Operation::CreateAccount, None)?;

        let account = Account {
            id: AccountId::new(self.shared.next_account.fetch_add(1, Ordering::Relaxed)),
            owner: input.owner,
            balance: input.balance,
            currency: input.currency,
            created_at: Utc::now(),
        };
        self.stage_account(account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.enter(Operation::GetAccount, Some(id))?;
        self.require_account(id)
    }

    async fn get_account_for_update(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.enter(Operation::GetAccountForUpdate, Some(id))?;
        self.lock_row_exclusive(id).await;
        self.require_account(id)
    }

    async fn update_account(&self, id: AccountId, balance: i64) -> Result<Account, LedgerError> {
        self.enter(Operation::UpdateAccount, Some(id))?;
        self.lock_row(id).await;

        let mut account = self.require_account(id)?;
        account.balance = balance;
        self.stage_account(account.clone());
        Ok(account)
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        self.enter(Operation::DeleteAccount, Some(id))?;
        self.lock_row_exclusive(id).await;
        self.require_account(id)?;

        let referenced = {
            let staged = guard(&self.staged);
            staged.entries.values().any(|e| e.account_id == id)
                || staged
                    .transfers
                    .values()
                    .any(|t| t.from_account_id == id || t.to_account_id == id)
        } || guard(&self.shared.tables).account_referenced(id);

        if referenced {
            return Err(LedgerError::Constraint(format!(
                "account {id} is still referenced by entries or transfers"
            )));
        }

        guard(&self.staged).accounts.insert(id, None);
        Ok(())
    }

    async fn list_accounts(&self, page: PageRequest) -> Result<Vec<Account>, LedgerError> {
        self.enter(Operation::ListAccounts, None)?;

        let mut visible = guard(&self.shared.tables).accounts.clone();
        for (id, account) in &guard(&self.staged).accounts {
            match account {
                Some(account) => {
                    visible.insert(*id, account.clone());
                }
                None => {
                    visible.remove(id);
                }
            }
        }

        Ok(visible
            .into_values()
            .skip(page.offset_usize())
            .take(page.limit_usize())
            .collect())
    }

    async fn add_account_balance(&self, id: AccountId, amount: i64) -> Result<Account, LedgerError> {
        self.enter(Operation::AddAccountBalance, Some(id))?;
        self.lock_row(id).await;

        let mut account = self.require_account(id)?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Constraint(format!("balance of account {id} out of range")))?;
        self.stage_account(account.clone());
        Ok(account)
    }

    async fn create_entry(&self, input: CreateEntryInput) -> Result<Entry, LedgerError> {
        self.enter(Operation::CreateEntry, Some(input.account_id))?;
        self.foreign_key("entries_account_id_fkey", input.account_id)
            .await?;

        let entry = Entry {
            id: EntryId::new(self.shared.next_entry.fetch_add(1, Ordering::Relaxed)),
            account_id: input.account_id,
            amount: input.amount,
            created_at: Utc::now(),
        };
        guard(&self.staged).entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.enter(Operation::GetEntry, None)?;

        if let Some(entry) = guard(&self.staged).entries.get(&id) {
            return Ok(entry.clone());
        }
        guard(&self.shared.tables)
            .entries
            .get(&id)
            .cloned()
            .ok_or(LedgerError::EntryNotFound(id))
    }

    async fn list_entries(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Entry>, LedgerError> {
        self.enter(Operation::ListEntries, Some(account_id))?;

        let mut visible: BTreeMap<EntryId, Entry> = guard(&self.shared.tables)
            .entries
            .iter()
            .filter(|(_, e)| e.account_id == account_id)
            .map(|(id, e)| (*id, e.clone()))
            .collect();
        visible.extend(
            guard(&self.staged)
                .entries
                .iter()
                .filter(|(_, e)| e.account_id == account_id)
                .map(|(id, e)| (*id, e.clone())),
        );

        Ok(visible
            .into_values()
            .skip(page.offset_usize())
            .take(page.limit_usize())
            .collect())
    }

    async fn create_transfer(&self, input: CreateTransferInput) -> Result<Transfer, LedgerError> {
        self.enter(Operation::CreateTransfer, None)?;
        self.foreign_key("transfers_from_account_id_fkey", input.from_account_id)
            .await?;
        self.foreign_key("transfers_to_account_id_fkey", input.to_account_id)
            .await?;

        if input.amount <= 0 {
            return Err(LedgerError::Constraint(format!(
                "transfers_amount_check: amount {} must be positive",
                input.amount
            )));
        }

        let transfer = Transfer {
            id: TransferId::new(self.shared.next_transfer.fetch_add(1, Ordering::Relaxed)),
            from_account_id: input.from_account_id,
            to_account_id: input.to_account_id,
            amount: input.amount,
            created_at: Utc::now(),
        };
        guard(&self.staged)
            .transfers
            .insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.enter(Operation::GetTransfer, None)?;

        if let Some(transfer) = guard(&self.staged).transfers.get(&id) {
            return Ok(transfer.clone());
        }
        guard(&self.shared.tables)
            .transfers
            .get(&id)
            .cloned()
            .ok_or(LedgerError::TransferNotFound(id))
    }

    async fn list_transfers(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Transfer>, LedgerError> {
        self.enter(Operation::ListTransfers, None)?;

        let matches =
            |t: &Transfer| t.from_account_id == from_account_id || t.to_account_id == to_account_id;

        let mut visible: BTreeMap<TransferId, Transfer> = guard(&self.shared.tables)
            .transfers
            .values()
            .filter(|t| matches(t))
            .map(|t| (t.id, t.clone()))
            .collect();
        visible.extend(
            guard(&self.staged)
                .transfers
                .values()
                .filter(|t| matches(t))
                .map(|t| (t.id, t.clone())),
        );

        Ok(visible
            .into_values()
            .skip(page.offset_usize())
            .take(page.limit_usize())
            .collect())
    }
}

impl UnitOfWork for MemoryTx {
    async fn commit(self) -> Result<(), LedgerError> {
        self.enter(Operation::Commit, None)?;
        self.apply();
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.enter(Operation::Rollback, None)
    }
}

impl TransactionalStore for InMemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, LedgerError> {
        let tx = self.open();
        tx.enter(Operation::Begin, None)?;
        Ok(tx)
    }
}

/// Runs one operation in its own unit of work, committing on success.
async fn autocommit<T>(tx: MemoryTx, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            drop(tx);
            Err(err)
        }
    }
}

impl LedgerQueries for InMemoryStore {
    async fn create_account(&self, input: CreateAccountInput) -> Result<Account, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.create_account(input).await;
        autocommit(tx, result).await
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.get_account(id).await;
        autocommit(tx, result).await
    }

    async fn get_account_for_update(&self, id: AccountId) -> Result<Account, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.get_account_for_update(id).await;
        autocommit(tx, result).await
    }

    async fn update_account(&self, id: AccountId, balance: i64) -> Result<Account, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.update_account(id, balance).await;
        autocommit(tx, result).await
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        let tx = self.begin().await?;
        let result = tx.delete_account(id).await;
        autocommit(tx, result).await
    }

    async fn list_accounts(&self, page: PageRequest) -> Result<Vec<Account>, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.list_accounts(page).await;
        autocommit(tx, result).await
    }

    async fn add_account_balance(&self, id: AccountId, amount: i64) -> Result<Account, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.add_account_balance(id, amount).await;
        autocommit(tx, result).await
    }

    async fn create_entry(&self, input: CreateEntryInput) -> Result<Entry, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.create_entry(input).await;
        autocommit(tx, result).await
    }

    async fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.get_entry(id).await;
        autocommit(tx, result).await
    }

    async fn list_entries(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Entry>, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.list_entries(account_id, page).await;
        autocommit(tx, result).await
    }

    async fn create_transfer(&self, input: CreateTransferInput) -> Result<Transfer, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.create_transfer(input).await;
        autocommit(tx, result).await
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.get_transfer(id).await;
        autocommit(tx, result).await
    }

    async fn list_transfers(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: PageRequest,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let tx = self.begin().await?;
        let result = tx.list_transfers(from_account_id, to_account_id, page).await;
        autocommit(tx, result).await
    }
}
