use sea_orm_migration::prelude::*;
use staking_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260801_000005_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(option_refresh_job::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(option_refresh_job::Column::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(option_refresh_job::Column::Trigger).string().not_null())
                    .col(ColumnDef::new(option_refresh_job::Column::Status).string().not_null())
                    .col(
                        ColumnDef::new(option_refresh_job::Column::Attempts)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(option_refresh_job::Column::AvailableAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(option_refresh_job::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(option_refresh_job::Column::FinishedAt).big_integer())
                    .col(ColumnDef::new(option_refresh_job::Column::Result).string())
                    .col(ColumnDef::new(option_refresh_job::Column::LastError).string())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(option_refresh_job::Entity).to_owned())
            .await
    }
}
