//! Transfer repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::transfers;

/// Transfer repository. Transfers are append-only.
#[derive(Debug, Clone, Copy)]
pub struct TransferRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TransferRepository<'a, C> {
    /// Creates a repository over `db`, a pool or an open transaction.
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Records a transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including when either account
    /// does not exist or the amount is not positive.
    pub async fn create(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<transfers::Model, DbErr> {
        let transfer = transfers::ActiveModel {
            from_account_id: Set(from_account_id),
            to_account_id: Set(to_account_id),
            amount: Set(amount),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        transfer.insert(self.db).await
    }

    /// Finds a transfer by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<transfers::Model>, DbErr> {
        transfers::Entity::find_by_id(id).one(self.db).await
    }

    /// Lists transfers sent from `from_account_id` or received by
    /// `to_account_id`, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<transfers::Model>, DbErr> {
        transfers::Entity::find()
            .filter(
                Condition::any()
                    .add(transfers::Column::FromAccountId.eq(from_account_id))
                    .add(transfers::Column::ToAccountId.eq(to_account_id)),
            )
            .order_by_asc(transfers::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db)
            .await
    }
}
