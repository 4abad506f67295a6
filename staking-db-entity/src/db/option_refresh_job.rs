use sea_orm::entity::prelude::*;

/// One scheduled or operator-triggered options synchronizer run, with the
/// attempt counter and outcome kept visible for operators.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "option_refresh_job", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub trigger: String,
    pub status: String,
    pub attempts: i32,
    pub available_at: i64,
    pub created_at: i64,
    pub finished_at: Option<i64>,
    pub result: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
