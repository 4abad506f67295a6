use sea_orm::entity::prelude::*;

/// Canonical record of one user's stake and its later unstake, keyed by
/// the stake transaction hash. An unstake mutates this row rather than
/// creating a second one.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "staking_transaction", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tx_hash: String,
    pub user_address: String,
    pub token: String,
    pub token_address: String,
    /// Decimal string in human units, not base units.
    pub amount: String,
    pub protocol: String,
    pub adapter_address: String,
    pub status: String,
    pub fee: String,
    pub network: String,
    pub created_at: i64,
    pub unstake_tx_hash: Option<String>,
    pub unstaked_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
