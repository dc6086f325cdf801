//! `SeaORM` Entity for entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use simplebank_core::ledger::Entry;
use simplebank_shared::types::{AccountId, EntryId};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    /// Signed: negative for debits, positive for credits.
    pub amount: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Entry {
    fn from(model: Model) -> Self {
        Self {
            id: EntryId::new(model.id),
            account_id: AccountId::new(model.account_id),
            amount: model.amount,
            created_at: model.created_at.to_utc(),
        }
    }
}
