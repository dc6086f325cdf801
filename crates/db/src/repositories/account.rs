//! Account repository for database operations.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::accounts;

/// Account repository for CRUD and balance operations.
#[derive(Debug, Clone, Copy)]
pub struct AccountRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AccountRepository<'a, C> {
    /// Creates a repository over `db`, a pool or an open transaction.
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        owner: &str,
        balance: i64,
        currency: &str,
    ) -> Result<accounts::Model, DbErr> {
        let account = accounts::ActiveModel {
            owner: Set(owner.to_string()),
            balance: Set(balance),
            currency: Set(currency.to_string()),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        account.insert(self.db).await
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(id).one(self.db).await
    }

    /// Finds an account by ID and locks its row until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id_for_update(&self, id: i64) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(id)
            .lock_exclusive()
            .one(self.db)
            .await
    }

    /// Overwrites an account's balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update_balance(
        &self,
        id: i64,
        balance: i64,
    ) -> Result<Option<accounts::Model>, DbErr> {
        let updated = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(balance))
            .filter(accounts::Column::Id.eq(id))
            .exec_with_returning(self.db)
            .await?;

        Ok(updated.into_iter().next())
    }

    /// Adds `amount` to an account's balance in a single statement.
    ///
    /// The update takes the row lock, so concurrent adds serialize.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn add_balance(&self, id: i64, amount: i64) -> Result<Option<accounts::Model>, DbErr> {
        let updated = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(amount),
            )
            .filter(accounts::Column::Id.eq(id))
            .exec_with_returning(self.db)
            .await?;

        Ok(updated.into_iter().next())
    }

    /// Deletes an account. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails, including when entries or
    /// transfers still reference the account.
    pub async fn delete(&self, id: i64) -> Result<u64, DbErr> {
        let result = accounts::Entity::delete_by_id(id).exec(self.db).await?;
        Ok(result.rows_affected)
    }

    /// Lists accounts ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, limit: u64, offset: u64) -> Result<Vec<accounts::Model>, DbErr> {
        accounts::Entity::find()
            .order_by_asc(accounts::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db)
            .await
    }
}
