use sea_orm_migration::prelude::*;
use staking_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260801_000001_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(staking_option::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(staking_option::Column::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(staking_option::Column::Protocol).string().not_null())
                    .col(ColumnDef::new(staking_option::Column::Token).string().not_null())
                    .col(ColumnDef::new(staking_option::Column::Apy).double().not_null())
                    .col(ColumnDef::new(staking_option::Column::Tvl).string().not_null())
                    .col(ColumnDef::new(staking_option::Column::TvlUsd).double().not_null())
                    .col(ColumnDef::new(staking_option::Column::Risk).string().not_null())
                    .col(
                        ColumnDef::new(staking_option::Column::AdapterAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(staking_option::Column::IsActive).boolean().not_null())
                    .col(ColumnDef::new(staking_option::Column::Network).string().not_null())
                    .col(
                        ColumnDef::new(staking_option::Column::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(staking_option::Column::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_staking_option_token")
                    .table(staking_option::Entity)
                    .col(staking_option::Column::Token)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(staking_option::Entity).to_owned())
            .await
    }
}
