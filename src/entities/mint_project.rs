//! Mint project entity: off-chain display metadata plus the advisory
//! cache of the last observed contract state. Cache and admin-override
//! columns feed display only; eligibility never reads them.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "mint_projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub image: String,
    pub network: String,
    /// Lower-cased, one project per deployed sale contract
    #[sea_orm(unique, column_type = "String(StringLen::N(42))")]
    pub contract_address: String,
    pub admin_status: Option<String>,
    pub admin_start_time: Option<DateTimeWithTimeZone>,
    pub admin_end_time: Option<DateTimeWithTimeZone>,
    pub cached_supply: Option<i64>,
    pub cached_minted: Option<i64>,
    pub cached_price: Option<String>,
    pub cached_status: Option<String>,
    pub last_sync_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::mint_transaction::Entity")]
    MintTransaction,
}

impl Related<super::mint_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MintTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
