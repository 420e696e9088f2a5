//! Mint transaction entity. The unique `tx_hash` column is what makes
//! registration idempotent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mint_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub project_id: i64,
    /// Lower-cased wallet that submitted the mint
    #[sea_orm(column_type = "String(StringLen::N(42))")]
    pub wallet_address: String,
    #[sea_orm(unique, column_type = "String(StringLen::N(66))")]
    pub tx_hash: String,
    pub token_id: Option<i64>,
    /// pending | confirmed | failed
    #[sea_orm(column_type = "String(StringLen::N(16))")]
    pub status: String,
    pub block_number: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::mint_project::Entity",
        from = "Column::ProjectId",
        to = "super::mint_project::Column::Id"
    )]
    MintProject,
}

impl Related<super::mint_project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MintProject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
