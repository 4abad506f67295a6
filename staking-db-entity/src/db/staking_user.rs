use sea_orm::entity::prelude::*;
use sea_orm::prelude::Decimal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "staking_user", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub wallet_address: String,
    pub created_at: i64,
    pub last_login: i64,
    pub total_staked: Decimal,
    pub total_earnings: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
