//! `SeaORM` Entity for transfers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use simplebank_core::ledger::Transfer;
use simplebank_shared::types::{AccountId, TransferId};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Always positive.
    pub amount: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::FromAccountId",
        to = "super::accounts::Column::Id"
    )]
    FromAccount,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::ToAccountId",
        to = "super::accounts::Column::Id"
    )]
    ToAccount,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Transfer {
    fn from(model: Model) -> Self {
        Self {
            id: TransferId::new(model.id),
            from_account_id: AccountId::new(model.from_account_id),
            to_account_id: AccountId::new(model.to_account_id),
            amount: model.amount,
            created_at: model.created_at.to_utc(),
        }
    }
}
