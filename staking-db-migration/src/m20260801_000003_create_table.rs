use sea_orm_migration::prelude::*;
use staking_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260801_000003_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(staking_user::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(staking_user::Column::WalletAddress)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(staking_user::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(staking_user::Column::LastLogin)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(staking_user::Column::TotalStaked).decimal().not_null())
                    .col(
                        ColumnDef::new(staking_user::Column::TotalEarnings)
                            .decimal()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(staking_user::Entity).to_owned())
            .await
    }
}
