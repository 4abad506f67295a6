use sea_orm::entity::prelude::*;

/// Durable per-event job row produced by the chain event watcher and
/// consumed by the reconciler. Uniqueness on (job_kind, tx_hash) makes
/// re-delivery of the same chain event a no-op insert conflict.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transaction_job", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub job_kind: String,
    pub tx_hash: String,
    pub user_address: String,
    pub token: String,
    pub token_address: Option<String>,
    pub adapter_address: Option<String>,
    pub amount: String,
    pub fee: Option<String>,
    pub block_number: i64,
    pub status: String,
    pub attempts: i32,
    pub available_at: i64,
    pub created_at: i64,
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
