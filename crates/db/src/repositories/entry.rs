//! Entry repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::entries;

/// Entry repository. Entries are append-only.
#[derive(Debug, Clone, Copy)]
pub struct EntryRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> EntryRepository<'a, C> {
    /// Creates a repository over `db`, a pool or an open transaction.
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Records a signed balance change on an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including when the account
    /// does not exist.
    pub async fn create(&self, account_id: i64, amount: i64) -> Result<entries::Model, DbErr> {
        let entry = entries::ActiveModel {
            account_id: Set(account_id),
            amount: Set(amount),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        entry.insert(self.db).await
    }

    /// Finds an entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<entries::Model>, DbErr> {
        entries::Entity::find_by_id(id).one(self.db).await
    }

    /// Lists an account's entries ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_account(
        &self,
        account_id: i64,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<entries::Model>, DbErr> {
        entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id))
            .order_by_asc(entries::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db)
            .await
    }
}
