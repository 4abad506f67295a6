use sea_orm::entity::prelude::*;

/// Catalog entry advertising one (protocol, token, network) staking
/// opportunity. Rows are deactivated when their adapter disappears from
/// the registry, never deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "staking_option", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub protocol: String,
    pub token: String,
    pub apy: f64,
    pub tvl: String,
    pub tvl_usd: f64,
    pub risk: String,
    pub adapter_address: String,
    pub is_active: bool,
    pub network: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
